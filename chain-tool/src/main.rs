// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use clap::{Parser, ValueEnum};
use extent_chain::{ChainSet, TraversalMode};
use std::fs::File;
use std::fmt::Write;
use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};

type Error = Box<dyn std::error::Error>;

/// Inspect extent chains saved in an image header.
#[derive(Parser)]
struct Opt {
    action: Action,

    /// Path of a file containing serialized chains.
    file: std::path::PathBuf,

    /// Number of chains stored in the file.
    #[arg(long, default_value_t = 1)]
    chains: usize,

    /// Stripe the walk across all chains.
    #[arg(long)]
    striped: bool,

    /// Number of blocks to move per step of the walk.
    #[arg(long, default_value_t = 1)]
    blocks_per_step: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    Ls,
    Walk,
}

fn ls_to_string(set: &ChainSet) -> String {
    let mut builder = Builder::new();
    builder.push_record(["Chain:", "Start:", "End:", "Blocks:"]);

    for (index, chain) in set.chains().iter().enumerate() {
        for extent in chain.extents() {
            builder.push_record([
                index.to_string(),
                extent.start().to_string(),
                extent.end().to_string(),
                extent.num_blocks().to_string(),
            ]);
        }
    }

    builder
        .build()
        .modify(Columns::new(1..), Alignment::right())
        .with(Style::empty())
        .to_string()
}

fn walk_to_string(
    set: &mut ChainSet,
    blocks_per_step: u32,
    mode: TraversalMode,
) -> String {
    let mut output = String::new();
    set.reset_to_start();

    // The first chain may be empty, in which case the walk starts with
    // the first `advance`.
    let mut block = set.current_offset();
    if block.is_none() {
        block = set.advance(blocks_per_step, mode);
    }

    while let (Some(chain), Some(b)) = (set.current_chain(), block) {
        // OK to unwrap: writing to a `String` can't fail.
        writeln!(output, "{chain} {b}").unwrap();
        block = set.advance(blocks_per_step, mode);
    }

    output
}

fn run(opt: &Opt) -> Result<(), Error> {
    let mut file = File::open(&opt.file)?;
    let mut set = ChainSet::deserialize(&mut file, opt.chains)?;

    match opt.action {
        Action::Ls => {
            println!("{}", ls_to_string(&set));
        }
        Action::Walk => {
            let mode = if opt.striped {
                TraversalMode::Striped
            } else {
                TraversalMode::Sequential
            };
            print!("{}", walk_to_string(&mut set, opt.blocks_per_step, mode));
        }
    }

    Ok(())
}

fn main() -> Result<(), Error> {
    let opt = Opt::parse();
    run(&opt)
}
