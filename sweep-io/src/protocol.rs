//! Triangulation lidar frame protocol.
//!
//! Frame format (all multi-byte fields little-endian):
//!
//! ```text
//! ┌──────┬──────┬──────┬──────┬─────────┬─────────┬─────────────────────────┐
//! │ 0xAA │ 0x55 │  CT  │ LSN  │ FSA (2) │ LSA (2) │ LSN × [dist (2), chk(1)]│
//! └──────┴──────┴──────┴──────┴─────────┴─────────┴─────────────────────────┘
//! ```
//!
//! - CT: packet type, bit 0 set on the zero-position packet of a revolution
//! - LSN: sample count (0 is malformed)
//! - FSA/LSA: start/end angle codes, `(raw >> 1) / 64.0` degrees
//! - dist: `raw / 4.0` millimeters, 0 means no return
//!
//! Per-sample angles are interpolated linearly between FSA and LSA, wrapping
//! through 360° when LSA < FSA.

use crate::error::{Error, Result};
use crate::types::Sample;

/// First sync byte
pub const SYNC_BYTE_1: u8 = 0xAA;
/// Second sync byte
pub const SYNC_BYTE_2: u8 = 0x55;

const HEADER_LEN: usize = 2;
const ANGLE_FIELDS_LEN: usize = 4;
const BYTES_PER_SAMPLE: usize = 3;
const MAX_PAYLOAD_LEN: usize = ANGLE_FIELDS_LEN + u8::MAX as usize * BYTES_PER_SAMPLE;

/// Packet type flag marking the first packet of a revolution
pub const PACKET_TYPE_SCAN_START: u8 = 0x01;

/// Decode an angle code into degrees.
#[inline]
pub fn decode_angle(raw: u16) -> f32 {
    (raw >> 1) as f32 / 64.0
}

/// Decode a distance code into millimeters.
#[inline]
pub fn decode_distance_mm(raw: u16) -> f32 {
    raw as f32 / 4.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    SeekFirstSync,
    SeekSecondSync,
    Header,
    Payload { packet_type: u8, sample_count: u8 },
}

/// A fully parsed frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Packet type byte (CT)
    pub packet_type: u8,
    /// Start angle in degrees as transmitted (may exceed 360)
    pub start_angle_deg: f32,
    /// End angle in degrees as transmitted (may exceed 360)
    pub end_angle_deg: f32,
    /// Sample count announced by the header
    pub sample_count: u8,
    /// Accepted samples (zero-distance returns removed)
    pub samples: Vec<Sample>,
}

impl DecodedFrame {
    /// Whether this frame starts a new revolution.
    pub fn is_scan_start(&self) -> bool {
        self.packet_type & PACKET_TYPE_SCAN_START != 0
    }
}

/// Running decoder counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames parsed to completion
    pub frames: u64,
    /// Samples emitted
    pub samples: u64,
    /// Samples dropped for a non-positive distance
    pub rejected_samples: u64,
    /// Second-sync mismatches (routine resynchronization)
    pub resyncs: u64,
    /// Frames abandoned mid-parse
    pub aborted_frames: u64,
}

/// Result of feeding a chunk of bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Frames completed in this chunk
    pub frames: usize,
    /// Samples appended to the output
    pub samples: usize,
    /// Frames aborted in this chunk
    pub aborted: usize,
}

/// Stateful byte-level frame parser.
///
/// Bytes may arrive in arbitrary chunks; parse state survives between calls.
pub struct FrameDecoder {
    state: DecodeState,
    header: [u8; HEADER_LEN],
    header_len: usize,
    payload: Vec<u8>,
    payload_len: usize,
    stats: DecoderStats,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::SeekFirstSync,
            header: [0u8; HEADER_LEN],
            header_len: 0,
            payload: Vec::with_capacity(MAX_PAYLOAD_LEN),
            payload_len: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Counters accumulated since construction.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// True while a header or payload is partially read.
    pub fn in_frame(&self) -> bool {
        matches!(
            self.state,
            DecodeState::Header | DecodeState::Payload { .. }
        )
    }

    /// Feed one byte.
    ///
    /// Returns `Ok(Some(frame))` when the byte completes a frame, and
    /// [`Error::FrameAbort`] when the header announces zero samples. Either
    /// way the decoder is back to seeking the first sync byte afterwards.
    pub fn push(&mut self, byte: u8) -> Result<Option<DecodedFrame>> {
        match self.state {
            DecodeState::SeekFirstSync => {
                if byte == SYNC_BYTE_1 {
                    self.state = DecodeState::SeekSecondSync;
                }
                Ok(None)
            }
            DecodeState::SeekSecondSync => {
                if byte == SYNC_BYTE_2 {
                    self.header_len = 0;
                    self.state = DecodeState::Header;
                } else {
                    self.stats.resyncs += 1;
                    // The mismatching byte may itself open the next frame
                    self.state = if byte == SYNC_BYTE_1 {
                        DecodeState::SeekSecondSync
                    } else {
                        DecodeState::SeekFirstSync
                    };
                }
                Ok(None)
            }
            DecodeState::Header => {
                self.header[self.header_len] = byte;
                self.header_len += 1;
                if self.header_len < HEADER_LEN {
                    return Ok(None);
                }

                let packet_type = self.header[0];
                let sample_count = self.header[1];
                if sample_count == 0 {
                    self.reset();
                    self.stats.aborted_frames += 1;
                    return Err(Error::FrameAbort("zero sample count"));
                }

                self.payload.clear();
                self.payload_len = ANGLE_FIELDS_LEN + sample_count as usize * BYTES_PER_SAMPLE;
                self.state = DecodeState::Payload {
                    packet_type,
                    sample_count,
                };
                Ok(None)
            }
            DecodeState::Payload {
                packet_type,
                sample_count,
            } => {
                self.payload.push(byte);
                if self.payload.len() < self.payload_len {
                    return Ok(None);
                }

                let frame = self.parse_payload(packet_type, sample_count);
                self.reset();
                self.stats.frames += 1;
                self.stats.samples += frame.samples.len() as u64;
                Ok(Some(frame))
            }
        }
    }

    /// Feed a chunk of bytes, appending every accepted sample to `out`.
    pub fn decode(&mut self, bytes: &[u8], out: &mut Vec<Sample>) -> DecodeSummary {
        let mut summary = DecodeSummary::default();

        for &byte in bytes {
            match self.push(byte) {
                Ok(Some(frame)) => {
                    summary.frames += 1;
                    summary.samples += frame.samples.len();
                    out.extend_from_slice(&frame.samples);
                }
                Ok(None) => {}
                Err(e) => {
                    summary.aborted += 1;
                    log::debug!("Decoder: {}", e);
                }
            }
        }

        summary
    }

    /// Drop any partially read frame and go back to sync seek.
    ///
    /// Returns true if a frame was in progress (counted as aborted).
    pub fn abort(&mut self) -> bool {
        let was_in_frame = self.in_frame();
        if was_in_frame {
            self.stats.aborted_frames += 1;
        }
        self.reset();
        was_in_frame
    }

    fn reset(&mut self) {
        self.state = DecodeState::SeekFirstSync;
        self.header_len = 0;
        self.payload.clear();
        self.payload_len = 0;
    }

    fn parse_payload(&mut self, packet_type: u8, sample_count: u8) -> DecodedFrame {
        let payload = &self.payload;
        let start_angle_deg = decode_angle(u16::from_le_bytes([payload[0], payload[1]]));
        let end_angle_deg = decode_angle(u16::from_le_bytes([payload[2], payload[3]]));

        let count = sample_count as usize;
        let mut span = if count > 1 {
            end_angle_deg - start_angle_deg
        } else {
            0.0
        };
        if span < 0.0 {
            span += 360.0;
        }
        let step = if count > 1 {
            span / (count - 1) as f32
        } else {
            0.0
        };

        let mut samples = Vec::with_capacity(count);
        let mut rejected = 0u64;

        for i in 0..count {
            let base = ANGLE_FIELDS_LEN + i * BYTES_PER_SAMPLE;
            let distance_mm = decode_distance_mm(u16::from_le_bytes([
                payload[base],
                payload[base + 1],
            ]));
            // payload[base + 2] is the per-sample check byte, unused

            if distance_mm <= 0.0 {
                rejected += 1;
                continue;
            }

            let angle_deg = (start_angle_deg + step * i as f32).rem_euclid(360.0);
            match Sample::new(angle_deg.to_radians(), distance_mm / 1000.0) {
                Some(sample) => samples.push(sample),
                None => rejected += 1,
            }
        }

        self.stats.rejected_samples += rejected;

        DecodedFrame {
            packet_type,
            start_angle_deg,
            end_angle_deg,
            sample_count,
            samples,
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a frame in wire format.
///
/// Angles are in degrees, distances in millimeters (0 = no return). At most
/// 255 distances are encoded; extra entries are ignored. Used by the replay
/// tooling and tests to synthesize sensor traffic.
pub fn encode_frame(
    packet_type: u8,
    start_angle_deg: f32,
    end_angle_deg: f32,
    distances_mm: &[f32],
) -> Vec<u8> {
    let count = distances_mm.len().min(u8::MAX as usize);
    let mut bytes = Vec::with_capacity(4 + ANGLE_FIELDS_LEN + count * BYTES_PER_SAMPLE);

    bytes.push(SYNC_BYTE_1);
    bytes.push(SYNC_BYTE_2);
    bytes.push(packet_type);
    bytes.push(count as u8);
    bytes.extend_from_slice(&encode_angle(start_angle_deg).to_le_bytes());
    bytes.extend_from_slice(&encode_angle(end_angle_deg).to_le_bytes());

    for &distance in &distances_mm[..count] {
        let raw = (distance * 4.0).round().clamp(0.0, u16::MAX as f32) as u16;
        bytes.extend_from_slice(&raw.to_le_bytes());
        bytes.push(0);
    }

    bytes
}

fn encode_angle(angle_deg: f32) -> u16 {
    // 15-bit code, bit 0 is the check bit the sensor always sets
    let code = (angle_deg * 64.0).round().clamp(0.0, (u16::MAX >> 1) as f32) as u16;
    (code << 1) | 0x01
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn decode_all(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<Sample> {
        let mut out = Vec::new();
        decoder.decode(bytes, &mut out);
        out
    }

    #[test]
    fn test_angle_and_distance_codes() {
        // 90° = 5760 * 1/64, shifted left with the check bit set
        assert_relative_eq!(decode_angle((5760 << 1) | 1), 90.0);
        assert_relative_eq!(decode_distance_mm(8000), 2000.0);
    }

    #[test]
    fn test_single_frame_interpolates_angles() {
        let bytes = encode_frame(0, 10.0, 20.0, &[1000.0, 1000.0, 1000.0]);
        let mut decoder = FrameDecoder::new();

        let mut frames = Vec::new();
        for &b in &bytes {
            if let Some(frame) = decoder.push(b).unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(frames.len(), 1);
        let samples = &frames[0].samples;
        assert_eq!(samples.len(), 3);
        assert_relative_eq!(samples[0].angle(), 10f32.to_radians(), epsilon = 1e-5);
        assert_relative_eq!(samples[1].angle(), 15f32.to_radians(), epsilon = 1e-5);
        assert_relative_eq!(samples[2].angle(), 20f32.to_radians(), epsilon = 1e-5);
        assert_relative_eq!(samples[0].distance(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_single_sample_uses_start_angle() {
        let bytes = encode_frame(0, 42.0, 300.0, &[500.0]);
        let mut decoder = FrameDecoder::new();
        let samples = decode_all(&mut decoder, &bytes);

        assert_eq!(samples.len(), 1);
        assert_relative_eq!(samples[0].angle(), 42f32.to_radians(), epsilon = 1e-5);
    }

    #[test]
    fn test_negative_span_wraps_through_zero() {
        // 350° -> 10° across 5 samples: 350, 355, 0, 5, 10
        let bytes = encode_frame(0, 350.0, 10.0, &[800.0; 5]);
        let mut decoder = FrameDecoder::new();
        let samples = decode_all(&mut decoder, &bytes);

        assert_eq!(samples.len(), 5);
        let degrees: Vec<f32> = samples.iter().map(|s| s.angle().to_degrees()).collect();
        assert_relative_eq!(degrees[0], 350.0, epsilon = 1e-3);
        assert_relative_eq!(degrees[1], 355.0, epsilon = 1e-3);
        assert!(degrees[2] < 1e-3 || degrees[2] > 359.999);
        assert_relative_eq!(degrees[3], 5.0, epsilon = 1e-3);
        assert_relative_eq!(degrees[4], 10.0, epsilon = 1e-3);
        for s in &samples {
            assert!((0.0..std::f32::consts::TAU).contains(&s.angle()));
        }
    }

    #[test]
    fn test_largest_wire_distance_is_accepted() {
        let bytes = encode_frame(0, 0.0, 0.0, &[16383.75]);
        let mut decoder = FrameDecoder::new();
        let samples = decode_all(&mut decoder, &bytes);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].distance(), crate::types::MAX_DISTANCE);
    }

    #[test]
    fn test_zero_distance_is_rejected() {
        let bytes = encode_frame(0, 0.0, 30.0, &[1000.0, 0.0, 1000.0, 0.0]);
        let mut decoder = FrameDecoder::new();
        let samples = decode_all(&mut decoder, &bytes);

        assert_eq!(samples.len(), 2);
        assert_eq!(decoder.stats().rejected_samples, 2);
        // Rejected samples keep their slot in the interpolation
        assert_relative_eq!(samples[1].angle(), 20f32.to_radians(), epsilon = 1e-5);
    }

    #[test]
    fn test_zero_sample_count_aborts() {
        let mut decoder = FrameDecoder::new();
        let bytes = [SYNC_BYTE_1, SYNC_BYTE_2, 0x00, 0x00];

        let mut aborted = false;
        for &b in &bytes {
            if let Err(Error::FrameAbort(_)) = decoder.push(b) {
                aborted = true;
            }
        }

        assert!(aborted);
        assert!(!decoder.in_frame());
        assert_eq!(decoder.stats().aborted_frames, 1);

        // Next frame decodes normally
        let samples = decode_all(&mut decoder, &encode_frame(0, 0.0, 10.0, &[100.0, 100.0]));
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_second_sync_mismatch_resyncs() {
        let mut bytes = vec![SYNC_BYTE_1, 0x12, 0x34];
        bytes.extend(encode_frame(0, 0.0, 10.0, &[100.0, 100.0]));

        let mut decoder = FrameDecoder::new();
        let samples = decode_all(&mut decoder, &bytes);

        assert_eq!(samples.len(), 2);
        assert_eq!(decoder.stats().resyncs, 1);
    }

    #[test]
    fn test_repeated_first_sync_is_not_lost() {
        // Trailing 0xAA of garbage directly before a real frame
        let mut bytes = vec![0x01, SYNC_BYTE_1];
        bytes.extend(encode_frame(0, 0.0, 10.0, &[100.0, 100.0]));

        let mut decoder = FrameDecoder::new();
        let samples = decode_all(&mut decoder, &bytes);

        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_chunked_input_survives_split_frames() {
        let mut bytes = encode_frame(0, 0.0, 90.0, &[500.0; 10]);
        bytes.extend(encode_frame(1, 90.0, 180.0, &[700.0; 10]));

        let mut decoder = FrameDecoder::new();
        let mut out = Vec::new();
        let mut frames = 0;
        for chunk in bytes.chunks(7) {
            frames += decoder.decode(chunk, &mut out).frames;
        }

        assert_eq!(frames, 2);
        assert_eq!(out.len(), 20);
        assert_relative_eq!(out[19].distance(), 0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_abort_drops_partial_frame() {
        let bytes = encode_frame(0, 0.0, 10.0, &[100.0, 100.0]);
        let mut decoder = FrameDecoder::new();
        let mut out = Vec::new();

        decoder.decode(&bytes[..6], &mut out);
        assert!(decoder.in_frame());
        assert!(decoder.abort());
        assert!(!decoder.in_frame());
        assert!(!decoder.abort());

        // Remainder of the interrupted frame is garbage, then a clean frame
        decoder.decode(&bytes[6..], &mut out);
        decoder.decode(&bytes, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(decoder.stats().aborted_frames, 1);
    }

    #[test]
    fn test_scan_start_flag() {
        let bytes = encode_frame(PACKET_TYPE_SCAN_START, 0.0, 0.0, &[100.0]);
        let mut decoder = FrameDecoder::new();
        let frame = bytes
            .iter()
            .find_map(|&b| decoder.push(b).unwrap())
            .unwrap();

        assert!(frame.is_scan_start());
        assert_eq!(frame.sample_count, 1);
    }
}
