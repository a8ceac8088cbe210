// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Base64 VLQ (Variable-Length Quantity) decoder for mapping segments.
//!
//! Each character carries 5 data bits plus a continuation bit. Groups are
//! little-endian; the lowest bit of a finished value is its sign.

/// Continuation bit (0b100000).
const CONTINUATION_BIT: u8 = 0b10_0000;
/// Data bits of a digit.
const DATA_MASK: u8 = 0b01_1111;
/// Groups shifted past this point no longer fit in an `i64`.
const MAX_SHIFT: u32 = 55;

/// Decode a Base64 character to its 6-bit value.
///
/// Characters outside the alphabet decode as 0, which also terminates the
/// value being accumulated.
fn decode_char(ch: u8) -> u8 {
	match ch {
		b'A'..=b'Z' => ch - b'A',
		b'a'..=b'z' => ch - b'a' + 26,
		b'0'..=b'9' => ch - b'0' + 52,
		b'+' => 62,
		b'/' => 63,
		_ => 0,
	}
}

/// Decode a VLQ-encoded segment into a vector of signed integers.
///
/// A trailing value whose last digit still has the continuation bit set is
/// incomplete and is not emitted.
pub fn decode_vlq_segment(segment: &str) -> Vec<i64> {
	let mut values = Vec::new();
	let mut value = 0i64;
	let mut shift = 0u32;

	for ch in segment.bytes() {
		let digit = decode_char(ch);

		let continuation = digit & CONTINUATION_BIT != 0;
		let digit_value = i64::from(digit & DATA_MASK);

		if shift <= MAX_SHIFT {
			value |= digit_value << shift;
		}
		shift += 5;

		if !continuation {
			let negated = value & 1 != 0;
			value >>= 1;
			if negated {
				value = -value;
			}
			values.push(value);
			value = 0;
			shift = 0;
		}
	}

	values
}
