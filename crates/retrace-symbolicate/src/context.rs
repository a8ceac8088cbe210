// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source context extraction for error viewers.

use retrace_core::SourceContext;

/// Extract the lines around a 0-based line number.
///
/// Returns `None` when the line is past the end of the content.
pub fn extract_context(
	source_content: &str,
	line: usize,
	context_lines: usize,
) -> Option<SourceContext> {
	let lines: Vec<&str> = source_content.lines().collect();

	let context_line = (*lines.get(line)?).to_string();

	let pre_start = line.saturating_sub(context_lines);
	let pre_context = lines[pre_start..line]
		.iter()
		.map(|s| s.to_string())
		.collect();

	let post_end = line
		.saturating_add(1)
		.saturating_add(context_lines)
		.min(lines.len());
	let post_context = lines[(line + 1)..post_end]
		.iter()
		.map(|s| s.to_string())
		.collect();

	Some(SourceContext {
		pre_context,
		context_line,
		post_context,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	const SOURCE: &str = "line 1\nline 2\nline 3\nline 4\nline 5\nline 6\nline 7";

	#[test]
	fn test_extract_context() {
		let ctx = extract_context(SOURCE, 3, 2).unwrap();

		assert_eq!(ctx.pre_context, vec!["line 2", "line 3"]);
		assert_eq!(ctx.context_line, "line 4");
		assert_eq!(ctx.post_context, vec!["line 5", "line 6"]);
	}

	#[test]
	fn test_extract_context_at_start() {
		let ctx = extract_context("line 1\nline 2\nline 3", 0, 2).unwrap();

		assert!(ctx.pre_context.is_empty());
		assert_eq!(ctx.context_line, "line 1");
		assert_eq!(ctx.post_context, vec!["line 2", "line 3"]);
	}

	#[test]
	fn test_extract_context_at_end() {
		let ctx = extract_context("line 1\nline 2\nline 3", 2, 2).unwrap();

		assert_eq!(ctx.pre_context, vec!["line 1", "line 2"]);
		assert_eq!(ctx.context_line, "line 3");
		assert!(ctx.post_context.is_empty());
	}

	#[test]
	fn test_extract_context_out_of_range() {
		assert!(extract_context(SOURCE, 7, 2).is_none());
		assert!(extract_context("", 0, 2).is_none());
	}

	#[test]
	fn test_unbounded_context_lines() {
		let ctx = extract_context("a\nb\nc", 1, usize::MAX).unwrap();
		assert_eq!(ctx.pre_context, vec!["a"]);
		assert_eq!(ctx.context_line, "b");
		assert_eq!(ctx.post_context, vec!["c"]);
	}

	#[test]
	fn test_zero_context_lines() {
		let ctx = extract_context(SOURCE, 4, 0).unwrap();
		assert!(ctx.pre_context.is_empty());
		assert_eq!(ctx.context_line, "line 5");
		assert!(ctx.post_context.is_empty());
	}
}
