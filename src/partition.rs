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



//! Hive partition model.
//!
//! A partition is an ordered list of `key=value` pairs. The order matters: it is the
//! directory nesting order on HDFS and the order keys are written in DDL.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{
	de,
	ser::{
		self,
		SerializeMap as _,
	},
	Deserialize,
	Serialize,
};
use std::{
	fmt,
	path::PathBuf,
	str::FromStr,
};

use crate::{
	dateparse,
	util::{
		is_digits,
		join_path,
		zfill,
	},
};

lazy_static! {
	static ref RE_PARTITION: Regex = Regex::new(r#"`?(\w+)`?=["']?([\w\-.]+)["']?"#).unwrap();
	static ref RE_CAMUS: Regex = Regex::new(
		r".*/hourly/(?P<year>[0-9]+)/(?P<month>[0-9]+)/(?P<day>[0-9]+)/(?P<hour>[0-9]+)"
	)
	.unwrap();
	static ref RE_SNAPSHOT_WEEK: Regex = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap();
	static ref RE_SNAPSHOT_MONTH: Regex = Regex::new(r"^[0-9]{4}-[0-9]{2}$").unwrap();
}

pub const DESC_SEPARATOR: &str = "/";
pub const SPEC_SEPARATOR: &str = ",";

const CAMUS_KEYS: [&str; 4] = ["year", "month", "day", "hour"];

/// Keys that may carry part of a partition's timestamp.
const TEMPORAL_KEYS: [&str; 8] = [
	"snapshot", "dt", "date", "year", "month", "day", "hour", "minute",
];

/// Zero-fill widths for keyless camus directories. Unlisted keys are not padded.
const ZFILL_WIDTHS: [(&str, usize); 4] = [("year", 4), ("month", 2), ("day", 2), ("hour", 2)];

fn zfill_width(key: &str) -> usize {
	ZFILL_WIDTHS
		.iter()
		.find(|&&(k, _)| k == key)
		.map(|&(_, width)| width)
		.unwrap_or(0)
}

/// Error from parsing a partition or inferring its date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
	/// Input was neither `key=value` pairs nor a camus `hourly/YYYY/MM/DD/HH` path.
	MalformedPath(String),
	/// The partition's temporal values do not form a date.
	DateParse(String),
}
impl fmt::Display for PartitionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PartitionError::MalformedPath(msg) => write!(f, "Malformed partition path: {}", msg),
			PartitionError::DateParse(msg) => write!(f, "Could not parse partition date: {}", msg),
		}
	}
}
impl std::error::Error for PartitionError {}

/// What a `snapshot` partition value stands for.
///
/// The `snapshot` key is overloaded: `YYYY-MM-DD` is the first day of a week,
/// `YYYY-MM` is a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotPeriod {
	Week,
	Month,
}
impl SnapshotPeriod {
	pub fn to_static_str(&self) -> &'static str {
		match self {
			SnapshotPeriod::Week => "week",
			SnapshotPeriod::Month => "month",
		}
	}
}
impl fmt::Display for SnapshotPeriod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.to_static_str())
	}
}

/// Integer value of a run of ASCII digits, as a string, without parsing it.
fn strip_leading_zeros(digits: &str) -> &str {
	let stripped = digits.trim_start_matches('0');
	if stripped.is_empty() {
		"0"
	} else {
		stripped
	}
}

/// A single Hive partition, e.g. `datacenter=eqiad/year=2017/month=11/day=2/hour=16`.
///
/// Immutable once parsed. Keys keep the order they were given in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HivePartition {
	pairs: Box<[(Box<str>, Box<str>)]>,
}
impl HivePartition {
	/// Parses a partition from any of its textual forms.
	///
	/// If `input` has an `=` in it, it is read as a Hive partition description
	/// (`k=v/k=v`) or spec (`` `k`='v',k=v ``); quoting and separators don't matter.
	/// Otherwise it must be a camus path ending in `hourly/YYYY/MM/DD/HH`, which gives
	/// `year`, `month`, `day` and `hour` keys with leading zeros dropped.
	pub fn parse(input: &str) -> Result<Self, PartitionError> {
		if input.contains('=') {
			let pairs = RE_PARTITION
				.captures_iter(input)
				.map(|caps| (Box::from(&caps[1]), Box::from(&caps[2])))
				.collect::<Vec<_>>();
			if pairs.is_empty() {
				return Err(PartitionError::MalformedPath(format!(
					"No key=value pairs found in {:?}",
					input
				)));
			}
			return Ok(Self::from_vec(pairs));
		}

		let caps = RE_CAMUS.captures(input).ok_or_else(|| {
			PartitionError::MalformedPath(format!(
				"No path matching {} was found in {:?}",
				RE_CAMUS.as_str(),
				input
			))
		})?;
		let pairs = CAMUS_KEYS
			.iter()
			.map(|&key| (Box::from(key), Box::from(strip_leading_zeros(&caps[key]))))
			.collect::<Vec<_>>();
		Ok(Self::from_vec(pairs))
	}

	/// Creates a partition from key/value pairs, keeping their order.
	pub fn from_vec(pairs: Vec<(Box<str>, Box<str>)>) -> Self {
		Self {
			pairs: pairs.into_boxed_slice(),
		}
	}

	/// Gets the value for a key, or `None` if the partition doesn't have it.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.iter().find(|&(k, _)| k == key).map(|(_, v)| v)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}

	/// Iterates over the key/value pairs in partition order.
	pub fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a str, &'a str)> {
		self.pairs.iter().map(|&(ref k, ref v)| (&**k, &**v))
	}

	/// Each pair as a `key=value` string.
	///
	/// With `quoted`, keys are wrapped in back-ticks and values that aren't all digits
	/// in single quotes, which makes each entry a valid HiveQL predicate.
	pub fn list(&self, quoted: bool) -> Vec<String> {
		self.iter()
			.map(|(k, v)| {
				if !quoted {
					format!("{}={}", k, v)
				} else if is_digits(v) {
					format!("`{}`={}", k, v)
				} else {
					format!("`{}`='{}'", k, v)
				}
			})
			.collect()
	}

	/// Hive partition description, e.g. `datacenter=eqiad/year=2017/month=11/day=21/hour=0`
	pub fn desc(&self) -> String {
		self.list(false).join(DESC_SEPARATOR)
	}

	/// Hive partition spec, e.g. `` `datacenter`='eqiad',`year`=2017,`month`=11 `` when quoted.
	pub fn spec(&self, quoted: bool) -> String {
		self.list(quoted).join(SPEC_SEPARATOR)
	}

	/// Path to the partition directory, below `base_path` if given.
	pub fn path(&self, base_path: Option<&str>) -> PathBuf {
		join_path(base_path, self.list(false))
	}

	/// Path to a keyless camus partition, e.g. `2017/02/05/00`, below `base_path` if given.
	pub fn camus_path(&self, base_path: Option<&str>) -> PathBuf {
		join_path(
			base_path,
			self.iter().map(|(k, v)| zfill(v, zfill_width(k))),
		)
	}

	/// Glob matching any partition as deep as this one, below `base_path` if given.
	pub fn glob(&self, base_path: Option<&str>) -> String {
		join_path(base_path, std::iter::repeat("*").take(self.len()))
			.to_string_lossy()
			.into_owned()
	}

	/// Date this partition covers.
	///
	/// Works with `year[/month[/day[/hour]]]` keys as well as single keys holding a date
	/// string, like `date=YYYY-MM-DD`, `month=YYYY-MM`, `hour=YYYY-MM-DD-HH` or
	/// `snapshot=YYYY-MM[-DD]`. Non-temporal keys are ignored. Missing fields default
	/// to 2000-01-01T00:00.
	pub fn datetime(&self) -> Result<NaiveDateTime, PartitionError> {
		let joined = self
			.iter()
			.filter(|(k, _)| TEMPORAL_KEYS.contains(k))
			.map(|(k, v)| match (k, v.parse::<u32>()) {
				// `2018-5-15-5` would read 5 as a minute
				("hour", Ok(hour)) => format!("{:02}", hour),
				_ => v.to_string(),
			})
			.collect::<Vec<_>>()
			.join("-");

		dateparse::parse_fuzzy(&joined, *dateparse::DEFAULT_ANCHOR)
			.map_err(PartitionError::DateParse)
	}

	/// Checks whether the partition has a `snapshot` key.
	pub fn contains_snapshot(&self) -> bool {
		self.contains_key("snapshot")
	}

	/// Period a `snapshot` value represents, or `None` if there is no snapshot or its
	/// value is in neither the week nor the month format.
	pub fn snapshot_period(&self) -> Option<SnapshotPeriod> {
		let snapshot = self.get("snapshot")?;
		if RE_SNAPSHOT_WEEK.is_match(snapshot) {
			Some(SnapshotPeriod::Week)
		} else if RE_SNAPSHOT_MONTH.is_match(snapshot) {
			Some(SnapshotPeriod::Month)
		} else {
			None
		}
	}
}
impl FromStr for HivePartition {
	type Err = PartitionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
impl fmt::Display for HivePartition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, (k, v)) in self.iter().enumerate() {
			if i != 0 {
				f.write_str(DESC_SEPARATOR)?;
			}
			write!(f, "{}={}", k, v)?;
		}
		Ok(())
	}
}

impl Serialize for HivePartition {
	fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.len()))?;
		for (k, v) in self.iter() {
			map.serialize_entry(k, v)?;
		}
		map.end()
	}
}

impl<'de> Deserialize<'de> for HivePartition {
	fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_map(DeVisitor)
	}
}
struct DeVisitor;
impl<'de> de::Visitor<'de> for DeVisitor {
	type Value = HivePartition;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("a map of partition keys to values")
	}

	fn visit_map<M: de::MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
		let mut vec = Vec::with_capacity(access.size_hint().unwrap_or(0));
		while let Some((k, v)) = access.next_entry::<String, String>()? {
			vec.push((k.into_boxed_str(), v.into_boxed_str()));
		}
		Ok(HivePartition::from_vec(vec))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;

	const DESC: &str = "datacenter=eqiad/year=2017/month=11/day=2/hour=16";

	fn pairs(p: &HivePartition) -> Vec<(&str, &str)> {
		p.iter().collect()
	}

	fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
		NaiveDate::from_ymd_opt(y, m, d)
			.unwrap()
			.and_hms_opt(h, 0, 0)
			.unwrap()
	}

	const EXPECTED: [(&str, &str); 5] = [
		("datacenter", "eqiad"),
		("year", "2017"),
		("month", "11"),
		("day", "2"),
		("hour", "16"),
	];

	#[test]
	fn parse_desc() {
		let p = HivePartition::parse(DESC).unwrap();
		assert_eq!(pairs(&p), EXPECTED);
	}

	#[test]
	fn parse_spec() {
		let unquoted = HivePartition::parse("datacenter=eqiad,year=2017,month=11,day=2,hour=16").unwrap();
		assert_eq!(pairs(&unquoted), EXPECTED);

		let quoted =
			HivePartition::parse("`datacenter`='eqiad',`year`=2017,`month`=11,`day`=2,`hour`=16")
				.unwrap();
		assert_eq!(pairs(&quoted), EXPECTED);

		let double = HivePartition::parse(r#"datacenter="eqiad",year="2017",month=11,day=2,hour=16"#)
			.unwrap();
		assert_eq!(pairs(&double), EXPECTED);
	}

	#[test]
	fn parse_hive_path() {
		let p = HivePartition::parse(
			"/path/to/data/datacenter=eqiad/year=2017/month=11/day=2/hour=16",
		)
		.unwrap();
		assert_eq!(pairs(&p), EXPECTED);
	}

	#[test]
	fn parse_camus_path() {
		let p = HivePartition::parse("/path/to/eqiad_data/hourly/2017/11/02/16").unwrap();
		assert_eq!(
			pairs(&p),
			[("year", "2017"), ("month", "11"), ("day", "2"), ("hour", "16")]
		);

		let midnight = HivePartition::parse("/data/hourly/2017/01/02/00").unwrap();
		assert_eq!(midnight.get("hour"), Some("0"));
		assert_eq!(midnight.get("month"), Some("1"));
	}

	#[test]
	fn parse_malformed() {
		match HivePartition::parse("/just/a/path") {
			Err(PartitionError::MalformedPath(_)) => {}
			other => panic!("Unexpected result: {:?}", other),
		}
		match HivePartition::parse("/data/hourly/2017/11/02") {
			Err(PartitionError::MalformedPath(_)) => {}
			other => panic!("Unexpected result: {:?}", other),
		}
		assert!(HivePartition::parse("=").is_err());
	}

	#[test]
	fn from_str() {
		let p: HivePartition = DESC.parse().unwrap();
		assert_eq!(p.to_string(), DESC);
	}

	#[test]
	fn list() {
		let p = HivePartition::parse(DESC).unwrap();
		assert_eq!(p.list(false), DESC.split('/').collect::<Vec<_>>());
	}

	#[test]
	fn desc() {
		let p = HivePartition::parse(DESC).unwrap();
		assert_eq!(p.desc(), DESC);
		assert_eq!(HivePartition::parse(&p.desc()).unwrap().desc(), p.desc());
	}

	#[test]
	fn spec() {
		let p = HivePartition::parse(DESC).unwrap();
		assert_eq!(
			p.spec(true),
			"`datacenter`='eqiad',`year`=2017,`month`=11,`day`=2,`hour`=16"
		);
		assert_eq!(p.spec(false), "datacenter=eqiad,year=2017,month=11,day=2,hour=16");
		assert_eq!(HivePartition::parse(&p.spec(false)).unwrap(), p);
		assert_eq!(HivePartition::parse(&p.spec(true)).unwrap(), p);
	}

	#[test]
	fn spec_quotes_non_numeric() {
		let p = HivePartition::parse("snapshot=2022-12/wiki=enwiki/version=1.2").unwrap();
		assert_eq!(
			p.spec(true),
			"`snapshot`='2022-12',`wiki`='enwiki',`version`='1.2'"
		);
	}

	#[test]
	fn path() {
		let p = HivePartition::parse(DESC).unwrap();
		assert_eq!(p.path(None), PathBuf::from(DESC));
		assert_eq!(
			p.path(Some("/wmf/data/webrequest")),
			PathBuf::from(format!("/wmf/data/webrequest/{}", DESC))
		);
	}

	#[test]
	fn camus_path() {
		let p = HivePartition::parse(DESC).unwrap();
		assert_eq!(
			p.camus_path(Some("/path/to/data/hourly")),
			PathBuf::from("/path/to/data/hourly/eqiad/2017/11/02/16")
		);

		let camus = HivePartition::parse("/path/to/eqiad_data/hourly/2017/11/02/16").unwrap();
		assert_eq!(camus.camus_path(Some("/base")), PathBuf::from("/base/2017/11/02/16"));

		let short = HivePartition::parse("year=17/month=1/day=3/hour=0").unwrap();
		assert_eq!(short.camus_path(None), PathBuf::from("0017/01/03/00"));
	}

	#[test]
	fn glob() {
		let p = HivePartition::parse(DESC).unwrap();
		assert_eq!(p.glob(None), "*/*/*/*/*");
		assert_eq!(p.glob(Some("/base")), "/base/*/*/*/*/*");
	}

	#[test]
	fn datetime_from_year_month_day() {
		let p = HivePartition::parse(DESC).unwrap();
		assert_eq!(p.datetime(), Ok(dt(2017, 11, 2, 16)));
		assert_eq!(p.datetime(), p.datetime());

		let single_digit_hour = HivePartition::parse("year=2018/month=5/day=15/hour=5").unwrap();
		assert_eq!(single_digit_hour.datetime(), Ok(dt(2018, 5, 15, 5)));
	}

	#[test]
	fn datetime_from_date_strings() {
		let date = HivePartition::parse("date=2019-03-04/wiki=enwiki").unwrap();
		assert_eq!(date.datetime(), Ok(dt(2019, 3, 4, 0)));

		let month = HivePartition::parse("month=2019-03").unwrap();
		assert_eq!(month.datetime(), Ok(dt(2019, 3, 1, 0)));

		let hour = HivePartition::parse("hour=2018-05-15-05").unwrap();
		assert_eq!(hour.datetime(), Ok(dt(2018, 5, 15, 5)));

		let year = HivePartition::parse("year=2017").unwrap();
		assert_eq!(year.datetime(), Ok(dt(2017, 1, 1, 0)));
	}

	#[test]
	fn datetime_from_lone_day_or_hour() {
		let day = HivePartition::parse("wiki=enwiki/day=2").unwrap();
		assert_eq!(day.datetime(), Ok(dt(2000, 1, 2, 0)));

		let hour = HivePartition::parse("hour=16").unwrap();
		assert_eq!(hour.datetime(), Ok(dt(2000, 1, 16, 0)));
	}

	#[test]
	fn datetime_from_snapshot_representing_week() {
		let p = HivePartition::parse("snapshot=2022-12-05/wiki=enwiki").unwrap();
		assert_eq!(p.datetime(), Ok(dt(2022, 12, 5, 0)));
		assert!(p.contains_snapshot());
		assert_eq!(p.snapshot_period(), Some(SnapshotPeriod::Week));
	}

	#[test]
	fn datetime_from_snapshot_representing_month() {
		let p = HivePartition::parse("snapshot=2022-12/wiki=enwiki").unwrap();
		assert_eq!(p.datetime(), Ok(dt(2022, 12, 1, 0)));
		assert!(p.contains_snapshot());
		assert_eq!(p.snapshot_period(), Some(SnapshotPeriod::Month));
	}

	#[test]
	fn datetime_from_invalid_snapshot_fails() {
		let p = HivePartition::parse("snapshot=current/wiki=enwiki").unwrap();
		match p.datetime() {
			Err(PartitionError::DateParse(_)) => {}
			other => panic!("Unexpected result: {:?}", other),
		}
		assert!(p.contains_snapshot());
		assert_eq!(p.snapshot_period(), None);
	}

	#[test]
	fn datetime_without_temporal_keys_fails() {
		let p = HivePartition::parse("wiki=enwiki").unwrap();
		assert!(p.datetime().is_err());
	}

	#[test]
	fn snapshot_absent() {
		let p = HivePartition::parse("year=2022/wiki=enwiki").unwrap();
		assert!(!p.contains_snapshot());
		assert_eq!(p.snapshot_period(), None);
	}

	#[test]
	fn serde_keeps_order() {
		let p = HivePartition::parse("wiki=enwiki/snapshot=2022-12").unwrap();
		let json = serde_json::to_string(&p).unwrap();
		assert_eq!(json, r#"{"wiki":"enwiki","snapshot":"2022-12"}"#);

		let back: HivePartition = serde_json::from_str(&json).unwrap();
		assert_eq!(back, p);
	}
}
