//! Audio output: cpal stream fed from a lock-free ring buffer.
//!
//! The emulation thread pushes the APU's float samples; the device
//! callback drains them. When the ring fills, `push_samples` spins
//! until the device catches up; that blocking push is what paces the
//! emulator to real time (44.1 kHz × ~735 samples per frame).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};

/// Must match the APU's generation rate.
pub const SAMPLE_RATE: u32 = nes_core::apu::SAMPLE_RATE;

/// Samples per NTSC frame, for ring sizing.
const SAMPLES_PER_FRAME: usize = (SAMPLE_RATE as usize) / 60;

pub struct AudioOutput {
    _stream: Stream,
    producer: ringbuf::HeapProd<f32>,
}

impl AudioOutput {
    /// Open the default output device as mono f32 at 44.1 kHz.
    /// Returns `None` when no device is available; the caller runs
    /// video-only in that case.
    pub fn new() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        // ~8 frames of slack against scheduling jitter.
        let ring = HeapRb::<f32>::new(SAMPLES_PER_FRAME * 8);
        let (mut producer, mut consumer) = ring.split();

        // Pre-fill half the ring with silence so the stream does not
        // underrun before the first frame lands.
        for _ in 0..SAMPLES_PER_FRAME * 4 {
            let _ = producer.try_push(0.0);
        }

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        *sample = consumer.try_pop().unwrap_or(0.0);
                    }
                },
                |err| eprintln!("audio stream error: {err}"),
                None,
            )
            .ok()?;

        stream.play().ok()?;

        Some(Self {
            _stream: stream,
            producer,
        })
    }

    /// Queue samples for the device, blocking while the ring is full.
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            while self.producer.try_push(sample).is_err() {
                std::thread::yield_now();
            }
        }
    }
}
