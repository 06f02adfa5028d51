/* This file is part of refinery-rust.
 *
 * Copyright © 2023 refinery-rust contributors
 *
 * Licensed under the Mozilla Public License Version 2.0
 * Fedora-License-Identifier: MPLv2.0
 * SPDX-2.0-License-Identifier: MPL-2.0
 * SPDX-3.0-License-Identifier: MPL-2.0
 *
 * refinery-rust is free software.
 * For more information on the license, see LICENSE.
 * For more information on free software, see <https://www.gnu.org/philosophy/free-sw.en.html>.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at <https://mozilla.org/MPL/2.0/>.
 */



//! Miscellaneous utility functions

use std::path::PathBuf;

/// Checks that `s` is non-empty and made only of ASCII digits.
///
/// Such values can be written as bare numeric literals in HiveQL.
pub fn is_digits(s: &str) -> bool {
	!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Left-pads `s` with zeros up to `width` characters. A leading sign stays in front
/// of the padding. Strings already at least `width` long are returned unchanged.
pub fn zfill(s: &str, width: usize) -> String {
	let len = s.chars().count();
	if len >= width {
		return s.to_string();
	}
	let (sign, digits) = match s.chars().next() {
		Some(c @ '+') | Some(c @ '-') => (Some(c), &s[1..]),
		_ => (None, s),
	};

	let mut out = String::with_capacity(width);
	if let Some(c) = sign {
		out.push(c);
	}
	out.extend(std::iter::repeat('0').take(width - len));
	out.push_str(digits);
	out
}

/// Joins path segments, optionally below `base`.
pub fn join_path<I, S>(base: Option<&str>, segments: I) -> PathBuf
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut path = base.map(PathBuf::from).unwrap_or_default();
	for segment in segments {
		path.push(segment.as_ref());
	}
	path
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn digits() {
		assert!(is_digits("2017"));
		assert!(is_digits("02"));
		assert!(!is_digits(""));
		assert!(!is_digits("eqiad"));
		assert!(!is_digits("2022-12"));
		assert!(!is_digits("-1"));
	}

	#[test]
	fn zero_fill() {
		assert_eq!(zfill("2", 2), "02");
		assert_eq!(zfill("16", 2), "16");
		assert_eq!(zfill("123", 2), "123");
		assert_eq!(zfill("17", 4), "0017");
		assert_eq!(zfill("eqiad", 0), "eqiad");
		assert_eq!(zfill("-1", 3), "-01");
		assert_eq!(zfill("", 2), "00");
	}

	#[test]
	fn join() {
		assert_eq!(
			join_path(Some("/base"), &["a=1", "b=2"]),
			PathBuf::from("/base/a=1/b=2")
		);
		assert_eq!(
			join_path(Some("/base/"), &["a=1"]),
			PathBuf::from("/base/a=1")
		);
		assert_eq!(join_path(None, &["a=1", "b=2"]), PathBuf::from("a=1/b=2"));
	}
}
