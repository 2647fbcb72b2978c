// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{anyhow, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use squash_core::{complex_ptrs, foreach_arg, resolve_mut, squash_ptr};
use squash_types::{
    Arg, ArgCommon, BinaryFormat, Call, ConstArg, Dir, Field, GroupArg, Prog, PointerArg,
    Registry, RegistryBuilder, Target, Type, TypeCommon, TypeKind,
};

trait CliCommand {
    fn run(&self) -> Result<()>;
}

#[derive(Args)]
struct TargetSource {
    /// Target CPU architecture.
    #[arg(long, default_value = "amd64")]
    arch: String,

    /// Target operating system.
    #[arg(long, default_value = "linux")]
    os: String,

    /// Target pointer width in bytes.
    #[arg(long, default_value_t = 8)]
    ptr_size: u64,
}

impl TargetSource {
    /// Build a registry containing the any-family plus the demo
    /// program's own types, and the demo program itself, in one arena
    /// so every `TypeId` the program uses resolves against the same
    /// registry a subcommand then classifies/squashes with.
    fn registry_and_demo_prog(&self) -> Result<(Registry, Prog)> {
        let mut builder = RegistryBuilder::new();
        squash_types::push_any_family(&mut builder, self.ptr_size);
        let prog = demo_prog(&mut builder, self.ptr_size);
        let registry = builder
            .finish(Target::new(self.arch.clone(), self.os.clone(), self.ptr_size))
            .map_err(|err| anyhow!("bootstrapping any-family: {err}"))?;
        Ok((registry, prog))
    }
}

/// Assemble a small demo program: one call with a pointer to a
/// variable-length struct (a complex pointer) so every subcommand has
/// something to classify and squash. Pushes the demo's own leaf types
/// into `builder`, which must already contain the any-family.
fn demo_prog(builder: &mut RegistryBuilder, ptr_size: u64) -> Prog {
    let int32 = builder.push(Type::new(
        TypeCommon::scalar(4, "int32", BinaryFormat::NativeEndian),
        TypeKind::Integer { pad: false },
    ));
    let tail = builder.push(Type::new(
        TypeCommon::aggregate(0, "tail"),
        TypeKind::Array {
            elem: int32,
            len: squash_types::ArrayLen::Range(0, 4),
        },
    ));
    let payload = builder.push(Type::new(
        TypeCommon::aggregate(0, "payload"),
        TypeKind::Struct {
            fields: vec![Field::new("header", int32), Field::new("tail", tail)],
            varlen: true,
            overlay_field: false,
        },
    ));
    let ptr_ty = builder.push(Type::new(
        TypeCommon::scalar(ptr_size, "ptr[payload]", BinaryFormat::NativeEndian),
        TypeKind::Ptr {
            elem: payload,
            squashable_elem: true,
            ptr_width: ptr_size,
        },
    ));

    let header = Arg::Const(ConstArg::new(ArgCommon::new(int32, Dir::In, 4), 7));
    let tail_elems = vec![
        Arg::Const(ConstArg::new(ArgCommon::new(int32, Dir::In, 4), 1)),
        Arg::Const(ConstArg::new(ArgCommon::new(int32, Dir::In, 4), 2)),
    ];
    let tail_arg = Arg::Group(GroupArg::new(ArgCommon::new(tail, Dir::In, 8), tail_elems));
    let payload_arg = Arg::Group(GroupArg::new(
        ArgCommon::new(payload, Dir::In, 12),
        vec![header, tail_arg],
    ));
    let ptr_arg = Arg::Pointer(PointerArg::new(
        ArgCommon::new(ptr_ty, Dir::In, ptr_size),
        Some(payload_arg),
        0,
    ));

    Prog::new(vec![Call::new(0, vec![ptr_arg])])
}

#[derive(Parser)]
struct ListComplex {
    #[command(flatten)]
    target: TargetSource,
}

impl CliCommand for ListComplex {
    fn run(&self) -> Result<()> {
        let (registry, prog) = self.target.registry_and_demo_prog()?;

        let locations = complex_ptrs(&registry, &prog);
        println!("{} complex pointer(s) found", locations.len());
        for loc in &locations {
            println!("  call #{}: {:?}", loc.call_index, loc.path);
        }

        Ok(())
    }
}

#[derive(Parser)]
struct Squash {
    #[command(flatten)]
    target: TargetSource,
}

impl CliCommand for Squash {
    fn run(&self) -> Result<()> {
        let (registry, mut prog) = self.target.registry_and_demo_prog()?;

        let locations = complex_ptrs(&registry, &prog);
        println!("squashing {} complex pointer(s)", locations.len());

        for loc in &locations {
            let call = &mut prog.calls[loc.call_index];
            let arg = resolve_mut(call, &loc.path);
            match arg {
                Arg::Pointer(ptr) => squash_ptr(&registry, ptr)?,
                other => return Err(anyhow!("complex_ptrs location was not a pointer: {other:?}")),
            }
        }

        for call in &prog.calls {
            foreach_arg(call, |arg, path, _ctx| {
                println!("{:?}: {:?}", path, arg);
            });
        }

        Ok(())
    }
}

#[derive(Subcommand)]
enum Subcommands {
    /// List the complex pointers found in the built-in demo program.
    ListComplex(ListComplex),
    /// Squash the built-in demo program's complex pointers and print
    /// the resulting argument graph.
    Squash(Squash),
}

impl Subcommands {
    fn as_cli_command(&self) -> &dyn CliCommand {
        match self {
            Self::ListComplex(c) => c,
            Self::Squash(c) => c,
        }
    }
}

#[derive(Parser)]
struct Cli {
    /// Increase logging verbosity. Can be specified multiple times
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Subcommands,
}

impl Cli {
    fn run() -> Result<()> {
        let cli = Self::parse();

        let log_level = match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        let mut builder = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(log_level.as_str()),
        );

        builder.init();

        let command = cli.command.as_cli_command();

        command.run()
    }
}

fn main() {
    let exit_code = match Cli::run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    };

    std::process::exit(exit_code)
}
