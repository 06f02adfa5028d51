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



#[macro_use]
extern crate log;

use serde::Serialize;
use std::{
	path::{
		Path,
		PathBuf,
	},
};
use structopt::StructOpt;

use refinery_rust::{
	hive,
	oozie::{
		self,
		BundleInfo,
		CoordinatorInfo,
		StaticJobInfo,
	},
	HivePartition,
};

/// Hive partition and Oozie scheduling helpers for the analytics refinery.
#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Args {
	/// Turn on debug logging
	#[structopt(short = "v", long)]
	verbose: bool,

	/// Log file destination. Default is stderr
	#[structopt(short = "L", long, parse(from_os_str))]
	log_file: Option<PathBuf>,

	#[structopt(subcommand)]
	command: Command,
}

#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab-case")]
enum Command {
	/// Prints every representation of one or more partitions.
	///
	/// Partitions can be given as Hive descriptions (`year=2017/month=11`), specs
	/// (`` `year`=2017,`month`=11 ``) or camus paths (`/data/hourly/2017/11/02/16`).
	Inspect {
		/// Directory prefixed to the partition paths and globs
		#[structopt(short = "b", long)]
		base_path: Option<String>,

		/// Print one JSON object per partition
		#[structopt(long)]
		json: bool,

		#[structopt(required = true)]
		partitions: Vec<HivePartition>,
	},

	/// Prints the HiveQL dropping the given partitions from a table.
	DropDdl {
		/// Table to drop partitions from
		#[structopt(short = "t", long)]
		table: String,

		partitions: Vec<HivePartition>,
	},

	/// Prints the next date an Oozie coordinator or bundle needs to run, from saved
	/// `/v2/job/<id>` JSON responses.
	NextDate {
		/// Coordinator job information, with all of its actions
		#[structopt(short = "c", long, parse(from_os_str), required_unless = "bundle")]
		coordinator: Option<PathBuf>,

		/// Bundle job information
		#[structopt(short = "B", long, parse(from_os_str), conflicts_with = "coordinator")]
		bundle: Option<PathBuf>,

		/// Job information of the bundle's coordinators, with all of their actions
		#[structopt(long, parse(from_os_str))]
		coordinators: Vec<PathBuf>,
	},
}

#[derive(Serialize)]
struct Inspection<'a> {
	partition: &'a HivePartition,
	desc: String,
	spec: String,
	quoted_spec: String,
	path: String,
	camus_path: String,
	glob: String,
	datetime: Option<String>,
	snapshot_period: Option<&'static str>,
}
impl<'a> Inspection<'a> {
	fn new(partition: &'a HivePartition, base_path: Option<&str>) -> Self {
		let datetime = match partition.datetime() {
			Ok(dt) => Some(dt.to_string()),
			Err(e) => {
				debug!("No date for {}: {}", partition, e);
				None
			}
		};
		Self {
			partition,
			desc: partition.desc(),
			spec: partition.spec(false),
			quoted_spec: partition.spec(true),
			path: partition.path(base_path).display().to_string(),
			camus_path: partition.camus_path(base_path).display().to_string(),
			glob: partition.glob(base_path),
			datetime,
			snapshot_period: partition.snapshot_period().map(|p| p.to_static_str()),
		}
	}

	fn print(&self) {
		println!("desc:        {}", self.desc);
		println!("spec:        {}", self.spec);
		println!("quoted spec: {}", self.quoted_spec);
		println!("path:        {}", self.path);
		println!("camus path:  {}", self.camus_path);
		println!("glob:        {}", self.glob);
		println!(
			"datetime:    {}",
			self.datetime.as_ref().map(|s| s.as_str()).unwrap_or("none")
		);
		println!("snapshot:    {}", self.snapshot_period.unwrap_or("none"));
	}
}

impl Command {
	/// Name logged with every line, as typed on the command line.
	fn name(&self) -> &'static str {
		match self {
			Command::Inspect { .. } => "inspect",
			Command::DropDdl { .. } => "drop-ddl",
			Command::NextDate { .. } => "next-date",
		}
	}
}

/// Logs to `log_file`, or stderr. Debug logging also shows which module logged.
fn configure_logging(
	verbose: bool,
	log_file: Option<&Path>,
	command: &'static str,
) -> Result<(), String> {
	let level_filter = if verbose {
		log::LevelFilter::Debug
	} else {
		log::LevelFilter::Info
	};

	let mut dispatch = fern::Dispatch::new()
		.format(move |out, message, record| {
			if verbose {
				out.finish(format_args!(
					"{}[{}][{}][{}]: {}",
					chrono::Utc::now().to_rfc3339(),
					command,
					record.target(),
					record.level(),
					message,
				))
			} else {
				out.finish(format_args!(
					"{}[{}][{}]: {}",
					chrono::Utc::now().to_rfc3339(),
					command,
					record.level(),
					message,
				))
			}
		})
		.level(level_filter);

	if let Some(dest) = log_file {
		let file = fern::log_file(dest)
			.map_err(|e| format!("Could not open {}: {}", dest.display(), e))?;
		dispatch = dispatch.chain(file);
	} else {
		dispatch = dispatch.chain(std::io::stderr());
	}

	dispatch.apply().map_err(|e| e.to_string())
}

fn main() {
	let args = Args::from_args();

	if let Err(err) = configure_logging(
		args.verbose,
		args.log_file.as_ref().map(|p| p.as_path()),
		args.command.name(),
	) {
		eprintln!("Could not initialize logging: {}", err);
		::std::process::exit(1);
	}

	if let Err(err) = run(args.command) {
		error!("{}", err);
		::std::process::exit(1);
	}
}

fn run(command: Command) -> Result<(), String> {
	match command {
		Command::Inspect {
			base_path,
			json,
			partitions,
		} => {
			for (i, partition) in partitions.iter().enumerate() {
				let inspection = Inspection::new(partition, base_path.as_ref().map(|s| s.as_str()));
				if json {
					let line = serde_json::to_string(&inspection)
						.map_err(|e| format!("Could not serialize {}: {}", partition, e))?;
					println!("{}", line);
				} else {
					if i != 0 {
						println!();
					}
					inspection.print();
				}
			}
			Ok(())
		}
		Command::DropDdl { table, partitions } => {
			if partitions.is_empty() {
				info!(
					"Not dropping any partitions for table {}. No partitions were given.",
					table
				);
				return Ok(());
			}
			let specs = partitions.iter().map(|p| p.spec(true)).collect::<Vec<_>>();
			println!("{}", hive::drop_partitions_ddl(&table, &specs));
			Ok(())
		}
		Command::NextDate {
			coordinator,
			bundle,
			coordinators,
		} => {
			let mut source = StaticJobInfo::new();
			for path in coordinators.iter() {
				let info: CoordinatorInfo = oozie::read_json(path)?;
				let coord_id = job_id(info.coord_job_id.clone(), path)?;
				source.add_coordinator(coord_id, info);
			}

			let next_date = if let Some(path) = bundle {
				let info: BundleInfo = oozie::read_json(&path)?;
				let bundle_id = job_id(None, &path)?;
				source.add_bundle(bundle_id.clone(), info);
				oozie::bundle_next_date(&mut source, &bundle_id)?
			} else if let Some(path) = coordinator {
				let info: CoordinatorInfo = oozie::read_json(&path)?;
				let coord_id = job_id(info.coord_job_id.clone(), &path)?;
				source.add_coordinator(coord_id.clone(), info);
				oozie::coordinator_next_date(&mut source, &coord_id, None)?
			} else {
				return Err("One of --coordinator or --bundle is required".into());
			};

			println!("{}", next_date.format("%Y-%m-%dT%H:%M:%S"));
			Ok(())
		}
	}
}

/// Job id from the document itself, falling back to the file name.
fn job_id(from_doc: Option<String>, path: &Path) -> Result<String, String> {
	if let Some(id) = from_doc {
		return Ok(id);
	}
	path.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.ok_or_else(|| format!("Could not determine a job id for {}", path.display()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn args_parse() {
		let args = Args::from_iter_safe(vec![
			"refinery-partition",
			"-v",
			"inspect",
			"--base-path",
			"/wmf/data",
			"year=2017/month=11",
			"/data/hourly/2017/11/02/16",
		])
		.unwrap();
		assert!(args.verbose);
		match args.command {
			Command::Inspect {
				base_path,
				json,
				partitions,
			} => {
				assert_eq!(base_path.as_ref().map(|s| s.as_str()), Some("/wmf/data"));
				assert!(!json);
				assert_eq!(partitions.len(), 2);
				assert_eq!(partitions[1].desc(), "year=2017/month=11/day=2/hour=16");
			}
			other => panic!("Unexpected command: {:?}", other),
		}
	}

	#[test]
	fn args_next_date_bundle() {
		let args = Args::from_iter_safe(vec![
			"refinery-partition",
			"next-date",
			"--bundle",
			"bundle.json",
			"--coordinators",
			"c1.json",
			"c2.json",
		])
		.unwrap();
		assert_eq!(args.command.name(), "next-date");
		match args.command {
			Command::NextDate {
				coordinator,
				bundle,
				coordinators,
			} => {
				assert!(coordinator.is_none());
				assert_eq!(bundle, Some(PathBuf::from("bundle.json")));
				assert_eq!(
					coordinators,
					vec![PathBuf::from("c1.json"), PathBuf::from("c2.json")]
				);
			}
			other => panic!("Unexpected command: {:?}", other),
		}
	}

	#[test]
	fn args_reject_bad_partition() {
		assert!(Args::from_iter_safe(vec!["refinery-partition", "inspect", "/just/a/path"]).is_err());
	}

	#[test]
	fn inspection() {
		let partition = HivePartition::parse("snapshot=2022-12/wiki=enwiki").unwrap();
		let inspection = Inspection::new(&partition, Some("/base"));
		assert_eq!(inspection.quoted_spec, "`snapshot`='2022-12',`wiki`='enwiki'");
		assert_eq!(inspection.path, "/base/snapshot=2022-12/wiki=enwiki");
		assert_eq!(inspection.glob, "/base/*/*");
		assert_eq!(inspection.datetime.as_ref().map(|s| s.as_str()), Some("2022-12-01 00:00:00"));
		assert_eq!(inspection.snapshot_period, Some("month"));
	}

	#[test]
	fn job_id_fallback() {
		let path = PathBuf::from("/tmp/0001234-230101000000000-oozie-oozi-C.json");
		assert_eq!(
			job_id(None, &path),
			Ok("0001234-230101000000000-oozie-oozi-C".to_string())
		);
		assert_eq!(job_id(Some("c".into()), &path), Ok("c".to_string()));
	}
}
