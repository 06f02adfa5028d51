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



//! Pure helpers for building Hive partition specs, DDL and partition dates.

use chrono::{
	NaiveDate,
	NaiveDateTime,
};
use regex::Regex;

use crate::{
	partition::{
		PartitionError,
		DESC_SEPARATOR,
		SPEC_SEPARATOR,
	},
	util::is_digits,
};

fn spec_part(key: &str, value: &str) -> String {
	if is_digits(value) {
		format!("{}={}", key, value)
	} else {
		format!("{}='{}'", key, value)
	}
}

/// Converts a line of `SHOW PARTITIONS` output into a partition spec.
///
/// `webrequest_source=text/year=2013/month=10` becomes
/// `webrequest_source='text',year=2013,month=10`.
pub fn partition_spec_from_partition_desc(desc: &str) -> Result<String, PartitionError> {
	let parts = desc
		.split(DESC_SEPARATOR)
		.map(|part| {
			let mut kv = part.splitn(2, '=');
			match (kv.next(), kv.next()) {
				(Some(key), Some(value)) if !value.contains('=') => Ok(spec_part(key, value)),
				_ => Err(PartitionError::MalformedPath(format!(
					"Partition {:?} is not in key=value form",
					part
				))),
			}
		})
		.collect::<Result<Vec<_>, _>>()?;
	Ok(parts.join(SPEC_SEPARATOR))
}

/// Builds a partition spec from a path, using the named capture groups of `regex`
/// as partition keys, in the order they appear in the regex.
///
/// For example, `/webrequest_(?P<webrequest_source>[^/]+)/hourly/(?P<year>[^/]+)/...` on
/// `/wmf/data/raw/webrequest/webrequest_text/hourly/2014/05/14/23` gives
/// `webrequest_source='text',year=2014,month=05,day=14,hour=23`.
pub fn partition_spec_from_path(path: &str, regex: &Regex) -> Result<String, PartitionError> {
	let caps = regex.captures(path).ok_or_else(|| {
		PartitionError::MalformedPath(format!(
			"No path matching {} was found in {:?}",
			regex.as_str(),
			path
		))
	})?;

	let parts = regex
		.capture_names()
		.filter_map(|name| name)
		.filter_map(|name| caps.name(name).map(|m| spec_part(name, m.as_str())))
		.collect::<Vec<_>>();
	Ok(parts.join(SPEC_SEPARATOR))
}

/// Gets the date of a partition spec from `regex`'s `year`, `month`, `day` and `hour`
/// named groups. Only `year` is required; the rest default to the start of the period.
pub fn partition_datetime_from_spec(
	spec: &str,
	regex: &Regex,
) -> Result<NaiveDateTime, PartitionError> {
	let caps = regex.captures(spec).ok_or_else(|| {
		PartitionError::MalformedPath(format!(
			"No spec matching {} was found in {:?}",
			regex.as_str(),
			spec
		))
	})?;

	let field = |name: &str, default: u32| -> Result<u32, PartitionError> {
		match caps.name(name) {
			Some(m) => m.as_str().parse::<u32>().map_err(|e| {
				PartitionError::DateParse(format!("Bad {} {:?} in {:?}: {}", name, m.as_str(), spec, e))
			}),
			None => Ok(default),
		}
	};

	let year = caps
		.name("year")
		.ok_or_else(|| PartitionError::DateParse(format!("No year found in {:?}", spec)))?
		.as_str()
		.parse::<i32>()
		.map_err(|e| PartitionError::DateParse(format!("Bad year in {:?}: {}", spec, e)))?;

	let (month, day, hour) = (field("month", 1)?, field("day", 1)?, field("hour", 0)?);

	NaiveDate::from_ymd_opt(year, month, day)
		.and_then(|d| d.and_hms_opt(hour, 0, 0))
		.ok_or_else(|| PartitionError::DateParse(format!("Date out of range in {:?}", spec)))
}

/// Format directives that each supply a given datetime field.
const HOUR_DIRECTIVES: [&str; 9] = ["%H", "%k", "%I", "%l", "%T", "%R", "%X", "%c", "%+"];
const MINUTE_DIRECTIVES: [&str; 6] = ["%M", "%T", "%R", "%X", "%c", "%+"];
const DAY_DIRECTIVES: [&str; 8] = ["%d", "%e", "%j", "%F", "%D", "%x", "%c", "%+"];
const YEAR_DIRECTIVES: [&str; 7] = ["%Y", "%y", "%F", "%D", "%x", "%c", "%+"];
const MONTH_DIRECTIVES: [&str; 10] = ["%m", "%b", "%B", "%h", "%j", "%F", "%D", "%x", "%c", "%+"];

/// Parses `input` with a strftime `format`, treating fields the format leaves out as
/// the start of their period (month and day 1, midnight). A missing year is 1900.
pub fn strptime(input: &str, format: &str) -> Result<NaiveDateTime, String> {
	let mut input = input.to_string();
	let mut format = format.to_string();
	let fillers: [(&[&str], &str, &str); 5] = [
		(&YEAR_DIRECTIVES, "%Y", "1900"),
		(&MONTH_DIRECTIVES, "%m", "01"),
		(&DAY_DIRECTIVES, "%d", "01"),
		(&HOUR_DIRECTIVES, "%H", "00"),
		(&MINUTE_DIRECTIVES, "%M", "00"),
	];
	for &(directives, directive, filler) in fillers.iter() {
		if !directives.iter().any(|d| format.contains(d)) {
			format.push(' ');
			format.push_str(directive);
			input.push(' ');
			input.push_str(filler);
		}
	}
	NaiveDateTime::parse_from_str(&input, &format)
		.map_err(|e| format!("Could not parse {:?} as {:?}: {}", input, format, e))
}

/// Gets the date of a partition path. The first capture group of `regex` is parsed with
/// the strftime `format`.
///
/// Returns `Ok(None)` if `regex` doesn't match the path.
pub fn partition_datetime_from_path(
	path: &str,
	regex: &Regex,
	format: &str,
) -> Result<Option<NaiveDateTime>, PartitionError> {
	let date_str = match regex.captures(path).and_then(|caps| caps.get(1)) {
		Some(m) => m.as_str(),
		None => {
			debug!("No path matching {} was found in {}", regex.as_str(), path);
			return Ok(None);
		}
	};
	strptime(date_str, format)
		.map(Some)
		.map_err(PartitionError::DateParse)
}

/// HiveQL dropping each of `partition_specs` from `table`, one statement per line,
/// in sorted spec order.
pub fn drop_partitions_ddl<S: AsRef<str>>(table: &str, partition_specs: &[S]) -> String {
	let mut specs = partition_specs.iter().map(|s| s.as_ref()).collect::<Vec<_>>();
	specs.sort_unstable();
	specs
		.iter()
		.map(|spec| format!("ALTER TABLE {} DROP IF EXISTS PARTITION ({});", table, spec))
		.collect::<Vec<_>>()
		.join("\n")
}
