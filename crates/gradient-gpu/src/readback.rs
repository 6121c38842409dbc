use std::sync::mpsc::{self, Receiver, TryRecvError};

use gradient_core::store::FrameSnapshot;
use wgpu::{Device, Queue, Texture};

use crate::error::GpuError;
use crate::stack::StackRenderer;

/// Bytes per `rgba32float` texel.
const TEXEL_BYTES: u32 = 16;

/// Row pitch for a texture-to-buffer copy, padded to wgpu's alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * TEXEL_BYTES;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Largest size with the aspect ratio of `requested` whose sides stay within
/// `max_dimension` and whose read-back buffer fits in `max_buffer_size`.
/// Both sides shrink by the same factor.
pub fn fit_export_size(
    requested: (u32, u32),
    max_dimension: u32,
    max_buffer_size: u64,
) -> (u32, u32) {
    let (w, h) = (requested.0.max(1) as f64, requested.1.max(1) as f64);
    let max_dimension = max_dimension.max(1) as f64;
    let texels = max_buffer_size as f64 / TEXEL_BYTES as f64;
    let mut factor = (max_dimension / w)
        .min(max_dimension / h)
        .min((texels / (w * h)).sqrt())
        .min(1.0);
    loop {
        let size = (
            ((w * factor).floor() as u32).max(1),
            ((h * factor).floor() as u32).max(1),
        );
        let bytes = padded_bytes_per_row(size.0) as u64 * size.1 as u64;
        if bytes <= max_buffer_size || size == (1, 1) {
            return size;
        }
        // row padding pushed it over
        factor *= 0.99;
    }
}

/// [`fit_export_size`] against `device`'s limits.
pub fn fit_to_device(device: &Device, requested: (u32, u32)) -> (u32, u32) {
    let limits = device.limits();
    fit_export_size(
        requested,
        limits.max_texture_dimension_2d,
        limits.max_buffer_size,
    )
}

/// Drop the row padding and quantise float RGBA to RGBA8 with alpha 255.
pub fn float_rows_to_rgba8(data: &[u8], width: u32, height: u32, padded_row: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity((width * height * 4) as usize);
    for row in 0..height as usize {
        let start = row * padded_row as usize;
        let row_bytes = &data[start..start + (width * TEXEL_BYTES) as usize];
        for texel in row_bytes.chunks_exact(TEXEL_BYTES as usize) {
            for channel in texel.chunks_exact(4).take(3) {
                let c: f32 = bytemuck::pod_read_unaligned(channel);
                out.push((c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8);
            }
            out.push(255);
        }
    }
    out
}

/// Copy an `rgba32float` texture back to the host as RGBA8. Blocks until the
/// GPU is done.
pub fn read_rgba8(
    device: &Device,
    queue: &Queue,
    texture: &Texture,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, GpuError> {
    let padded_row = padded_bytes_per_row(width);
    let buffer = staging_buffer(device, padded_row, height);
    copy_to_buffer(device, queue, texture, &buffer, width, height, padded_row);

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

    let pixels = {
        let data = slice.get_mapped_range();
        float_rows_to_rgba8(&data, width, height, padded_row)
    };
    buffer.unmap();
    Ok(pixels)
}

fn staging_buffer(device: &Device, padded_row: u32, height: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback"),
        size: padded_row as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    })
}

fn copy_to_buffer(
    device: &Device,
    queue: &Queue,
    texture: &Texture,
    buffer: &wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row: u32,
) {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback-encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));
}

/// Render `snapshot` at an arbitrary size, independent of any window, and
/// read it back as RGBA8. Used for supersampled image export.
///
/// Validation and out-of-memory errors are caught and returned rather than
/// reaching the device's uncaptured-error handler. Pass a size from
/// [`fit_to_device`].
pub fn render_offscreen(
    device: &Device,
    queue: &Queue,
    snapshot: &FrameSnapshot,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pixels = {
        let mut stack = StackRenderer::new(device, width, height);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("offscreen-encoder"),
        });
        stack.encode(device, queue, &mut encoder, snapshot);
        queue.submit(std::iter::once(encoder.finish()));
        let (width, height) = stack.size();
        read_rgba8(device, queue, stack.output_texture(), width, height)
    };

    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    if let Some(err) = validation.or(out_of_memory) {
        return Err(GpuError::Rejected(err.to_string()));
    }
    pixels
}

// ---------------------------------------------------------------------------
// FrameReader: non-blocking read-back for frame sequences
// ---------------------------------------------------------------------------

/// Staging buffers kept by [`FrameReader::default`].
pub const STAGING_SLOTS: usize = 3;

/// A frame copied back from the GPU, still as padded `rgba32float` rows.
/// Quantising is left to whoever consumes it.
#[derive(Debug, Clone)]
pub struct ReadbackFrame {
    pub width: u32,
    pub height: u32,
    padded_row: u32,
    data: Vec<u8>,
}

impl ReadbackFrame {
    pub fn to_rgba8(&self) -> Vec<u8> {
        float_rows_to_rgba8(&self.data, self.width, self.height, self.padded_row)
    }
}

struct Pending<T> {
    tag: T,
    seq: u64,
    mapped: Receiver<Result<(), wgpu::BufferAsyncError>>,
}

struct Slot<T> {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row: u32,
    pending: Option<Pending<T>>,
}

impl<T> Slot<T> {
    fn new(device: &Device, width: u32, height: u32) -> Self {
        let padded_row = padded_bytes_per_row(width);
        Self {
            buffer: staging_buffer(device, padded_row, height),
            width,
            height,
            padded_row,
            pending: None,
        }
    }
}

/// Copies textures into a small ring of `MAP_READ` buffers and hands them
/// back once the GPU has mapped them. Never waits on the GPU except in
/// [`FrameReader::finish`]. When every buffer is in flight, new frames are
/// dropped.
///
/// `T` tags each frame (a file path, a frame index) so results can be
/// matched up; frames come back in submission order.
pub struct FrameReader<T> {
    slots: Vec<Slot<T>>,
    capacity: usize,
    next_seq: u64,
}

impl<T> Default for FrameReader<T> {
    fn default() -> Self {
        Self::new(STAGING_SLOTS)
    }
}

impl<T> FrameReader<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    /// Frames copied but not yet handed back.
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.pending.is_some()).count()
    }

    /// Queue a copy of `texture`. Returns false, dropping the frame, when
    /// every staging buffer is still in flight or the frame is too large to
    /// read back.
    pub fn submit(
        &mut self,
        device: &Device,
        queue: &Queue,
        texture: &Texture,
        width: u32,
        height: u32,
        tag: T,
    ) -> bool {
        let bytes = padded_bytes_per_row(width) as u64 * height as u64;
        if bytes > device.limits().max_buffer_size {
            log::warn!("{width}×{height} frame is too large to read back");
            return false;
        }
        let idx = match self.slots.iter().position(|s| s.pending.is_none()) {
            Some(idx) => idx,
            None if self.slots.len() < self.capacity => {
                self.slots.push(Slot::new(device, width, height));
                self.slots.len() - 1
            }
            None => return false,
        };
        let slot = &mut self.slots[idx];
        if (slot.width, slot.height) != (width, height) {
            *slot = Slot::new(device, width, height);
        }
        copy_to_buffer(
            device,
            queue,
            texture,
            &slot.buffer,
            width,
            height,
            slot.padded_row,
        );

        let (tx, rx) = mpsc::channel();
        slot.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
        slot.pending = Some(Pending {
            tag,
            seq: self.next_seq,
            mapped: rx,
        });
        self.next_seq += 1;
        true
    }

    /// Frames the GPU has finished with, without waiting for the rest.
    pub fn poll(&mut self, device: &Device) -> Vec<(T, ReadbackFrame)> {
        if self.in_flight() == 0 {
            return Vec::new();
        }
        device.poll(wgpu::Maintain::Poll);
        self.collect()
    }

    /// Blocks until every in-flight frame is back.
    pub fn finish(&mut self, device: &Device) -> Vec<(T, ReadbackFrame)> {
        if self.in_flight() == 0 {
            return Vec::new();
        }
        device.poll(wgpu::Maintain::Wait);
        self.collect()
    }

    fn collect(&mut self) -> Vec<(T, ReadbackFrame)> {
        let mut order: Vec<(u64, usize)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| s.pending.as_ref().map(|p| (p.seq, idx)))
            .collect();
        order.sort_unstable();

        let mut ready = Vec::new();
        for (_, idx) in order {
            let slot = &mut self.slots[idx];
            let status = match &slot.pending {
                Some(p) => p.mapped.try_recv(),
                None => continue,
            };
            match status {
                Ok(Ok(())) => {
                    let data = slot.buffer.slice(..).get_mapped_range().to_vec();
                    slot.buffer.unmap();
                    if let Some(p) = slot.pending.take() {
                        let frame = ReadbackFrame {
                            width: slot.width,
                            height: slot.height,
                            padded_row: slot.padded_row,
                            data,
                        };
                        ready.push((p.tag, frame));
                    }
                }
                Ok(Err(e)) => {
                    log::warn!("dropped read-back frame: {e}");
                    slot.pending = None;
                }
                Err(TryRecvError::Disconnected) => {
                    log::warn!("dropped read-back frame: mapping was abandoned");
                    slot.pending = None;
                }
                // later frames wait behind this one
                Err(TryRecvError::Empty) => break,
            }
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_pad_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(16), 256);
        assert_eq!(padded_bytes_per_row(17), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64) % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
    }

    #[test]
    fn float_rows_are_unpadded_and_quantised() {
        let width = 2;
        let height = 2;
        let padded = padded_bytes_per_row(width);
        let mut data = vec![0u8; (padded * height) as usize];
        let row0: [f32; 8] = [1.0, 0.5, 0.0, 1.0, 2.0, -1.0, 0.25, 1.0];
        let row1: [f32; 8] = [0.0; 8];
        data[..32].copy_from_slice(bytemuck::cast_slice(&row0));
        data[padded as usize..padded as usize + 32].copy_from_slice(bytemuck::cast_slice(&row1));

        let out = float_rows_to_rgba8(&data, width, height, padded);
        assert_eq!(out.len(), 16);
        assert_eq!(&out[..8], &[255, 128, 0, 255, 255, 0, 64, 255]);
        assert_eq!(&out[8..], &[0, 0, 0, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn export_size_fits_the_default_buffer_limit() {
        let max_buffer = 256 << 20;
        let (w, h) = fit_export_size((5760, 3240), 8192, max_buffer);
        assert!(padded_bytes_per_row(w) as u64 * h as u64 <= max_buffer);
        assert!(w > 5000 && h > 2800, "shrunk too far: {w}×{h}");
        let aspect = w as f64 / h as f64;
        assert!((aspect - 16.0 / 9.0).abs() < 1e-3, "aspect {aspect}");
    }

    #[test]
    fn export_size_scales_both_sides_for_the_dimension_limit() {
        assert_eq!(fit_export_size((16384, 8192), 8192, u64::MAX), (8192, 4096));
        assert_eq!(fit_export_size((4096, 16384), 8192, u64::MAX), (2048, 8192));
    }

    #[test]
    fn export_size_within_limits_is_unchanged() {
        assert_eq!(fit_export_size((2560, 1440), 8192, 256 << 20), (2560, 1440));
        assert_eq!(fit_export_size((0, 0), 8192, 256 << 20), (1, 1));
    }

    /// Skips quietly on machines without an adapter.
    #[test]
    fn frame_reader_drops_frames_when_full_and_keeps_order() {
        let Ok(ctx) = pollster::block_on(crate::GpuContext::new_headless()) else {
            eprintln!("no GPU adapter, skipping");
            return;
        };
        let (w, h) = (4, 2);
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame-reader-test"),
            size: wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let texels: Vec<f32> = (0..w * h).flat_map(|_| [1.0, 0.0, 0.5, 1.0]).collect();
        ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texels),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(w * TEXEL_BYTES),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );

        let mut reader = FrameReader::new(2);
        assert!(reader.submit(&ctx.device, &ctx.queue, &texture, w, h, 0u32));
        assert!(reader.submit(&ctx.device, &ctx.queue, &texture, w, h, 1u32));
        assert!(!reader.submit(&ctx.device, &ctx.queue, &texture, w, h, 2u32));
        assert_eq!(reader.in_flight(), 2);

        let frames = reader.finish(&ctx.device);
        let tags: Vec<u32> = frames.iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, [0, 1]);
        assert_eq!(reader.in_flight(), 0);
        let pixels = frames[0].1.to_rgba8();
        assert_eq!(pixels.len(), (w * h * 4) as usize);
        assert_eq!(&pixels[..4], &[255, 0, 128, 255]);

        assert!(reader.submit(&ctx.device, &ctx.queue, &texture, w, h, 3u32));
        assert_eq!(reader.finish(&ctx.device).len(), 1);
    }

    /// Skips quietly on machines without an adapter.
    #[test]
    fn gpu_matches_cpu_reference() {
        use gradient_core::clock::Timeline;
        use gradient_core::quality::FramePolicy;
        use gradient_core::raster::render_snapshot;
        use gradient_core::store::GradientStore;

        let Ok(ctx) = pollster::block_on(crate::GpuContext::new_headless()) else {
            eprintln!("no GPU adapter, skipping");
            return;
        };

        let mut store = GradientStore::new();
        store.set_grain_amount(0.0);
        let mut timeline = Timeline::new();
        let policy = FramePolicy::default();
        store.tick(&mut timeline, 1.25, &policy);
        let snapshot = store.snapshot(&policy, &timeline);

        let (w, h) = (32, 24);
        let gpu = render_offscreen(&ctx.device, &ctx.queue, &snapshot, w, h).unwrap();
        let cpu = render_snapshot(&snapshot, w, h).to_rgba8();
        assert_eq!(gpu.len(), cpu.len());

        let diffs: Vec<i32> = gpu
            .iter()
            .zip(&cpu)
            .map(|(&g, &c)| (g as i32 - c as i32).abs())
            .collect();
        let max = diffs.iter().copied().max().unwrap_or(0);
        let mean = diffs.iter().sum::<i32>() as f32 / diffs.len() as f32;
        assert!(mean < 2.0, "mean channel diff {mean}");
        assert!(max <= 16, "max channel diff {max}");
    }
}
