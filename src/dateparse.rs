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



//! Lenient date parsing for partition values.
//!
//! Partition values spell dates in many ways (`2017-11-2-16`, `2022-12`, `20221205`,
//! `2017-11-02T16`). This parser only looks at the runs of digits in its input, assigns
//! them positionally to date fields, and fills in whatever is missing from a default.

use chrono::{
	Datelike,
	NaiveDate,
	NaiveDateTime,
	NaiveTime,
	Timelike,
};
use lazy_static::lazy_static;

lazy_static! {
	/// Anchor used for components a partition does not specify.
	pub static ref DEFAULT_ANCHOR: NaiveDateTime = NaiveDate::from_ymd_opt(2000, 1, 1)
		.and_then(|d| d.and_hms_opt(0, 0, 0))
		.unwrap();
}

const YEAR: usize = 0;
const MONTH: usize = 1;
const DAY: usize = 2;
const NUM_FIELDS: usize = 6;

/// Splits compact `YYYYMMDD[HH[MM[SS]]]` runs into their components.
fn expand_compact<'a>(token: &'a str, out: &mut Vec<&'a str>) {
	match token.len() {
		8 | 10 | 12 | 14 => {
			out.push(&token[..4]);
			let mut rest = &token[4..];
			while !rest.is_empty() {
				out.push(&rest[..2]);
				rest = &rest[2..];
			}
		}
		_ => out.push(token),
	}
}

/// Parses a date out of `input`, ignoring anything that isn't a run of digits.
///
/// The first field is the year when it has four digits; otherwise the year is taken from
/// `default` and the fields start at the month, or at the day when there is only one.
/// Fields then follow in month, day, hour, minute, second order. Any field not present in the input is taken
/// from `default`.
pub fn parse_fuzzy(input: &str, default: NaiveDateTime) -> Result<NaiveDateTime, String> {
	let mut fields = Vec::new();
	for token in input
		.split(|c: char| !c.is_ascii_digit())
		.filter(|s| !s.is_empty())
	{
		expand_compact(token, &mut fields);
	}

	if fields.is_empty() {
		return Err(format!("String does not contain a date: {:?}", input));
	}

	let start = if fields[0].len() == 4 {
		YEAR
	} else if fields.len() == 1 {
		DAY
	} else {
		MONTH
	};
	if start + fields.len() > NUM_FIELDS {
		return Err(format!("Too many numeric fields in {:?}", input));
	}

	let mut values = [None; NUM_FIELDS];
	for (i, field) in fields.iter().enumerate() {
		let slot = start + i;
		if slot != YEAR && field.len() > 2 {
			return Err(format!("Unexpected field {:?} in {:?}", field, input));
		}
		let value = field
			.parse::<u32>()
			.map_err(|e| format!("Could not parse {:?} in {:?}: {}", field, input, e))?;
		values[slot] = Some(value);
	}

	let year = values[0].map(|y| y as i32).unwrap_or_else(|| default.year());
	let date = NaiveDate::from_ymd_opt(
		year,
		values[1].unwrap_or_else(|| default.month()),
		values[2].unwrap_or_else(|| default.day()),
	)
	.ok_or_else(|| format!("Day is out of range for month in {:?}", input))?;
	let time = NaiveTime::from_hms_opt(
		values[3].unwrap_or_else(|| default.hour()),
		values[4].unwrap_or_else(|| default.minute()),
		values[5].unwrap_or_else(|| default.second()),
	)
	.ok_or_else(|| format!("Time is out of range in {:?}", input))?;

	Ok(date.and_time(time))
}
