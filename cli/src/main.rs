mod config;

use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use codeblock::graph::{Endpoint, MemoryGraph};
use codeblock::normalize::normalize;
use codeblock::transaction::UndoLog;
use codeblock::{BlockLangParser, CodeBlock, PortSide, PortSpec, Statement};

#[derive(Parser)]
#[command(name = "cbn", version, about = "Code block node analyzer")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// TOML file with a `[layout]` section
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the ports a block's source produces
    Analyze(AnalyzeArgs),

    /// Edit a wired block from one source to another and report the wires kept
    Rebuild(RebuildArgs),

    /// Print the normalized source
    Normalize {
        /// Block source file
        file: String,
    },
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Block source file
    file: String,

    /// Dump parsed AST
    #[arg(long)]
    ast: bool,

    /// Dump analyzed statements
    #[arg(long)]
    statements: bool,
}

#[derive(clap::Args)]
struct RebuildArgs {
    /// Source before the edit; every port gets one wire
    old: String,

    /// Source after the edit
    new: String,
}

/// `RUST_LOG` filtering, `warn` when unset.
fn log_builder() -> env_logger::Builder {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
}

fn main() {
    log_builder().init();

    let cli = Cli::parse();
    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    log::debug!("output layout: {:?}", config.layout);
    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let code = match cli.command {
        Command::Analyze(args) => do_analyze(args, &config, color_choice),
        Command::Rebuild(args) => do_rebuild(args, &config),
        Command::Normalize { file } => do_normalize(&file),
    };
    process::exit(code);
}

fn read_source(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn new_block(config: &config::Config) -> CodeBlock {
    CodeBlock::with_parts(Box::new(BlockLangParser), Box::new(log_builder().build()), config.layout)
}

fn do_normalize(file: &str) -> i32 {
    let text = normalize(&read_source(file));
    let mut stdout = std::io::stdout().lock();
    match write!(stdout, "{}", text).and_then(|()| stdout.flush()) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: cannot write output: {}", e);
            1
        }
    }
}

fn do_analyze(args: AnalyzeArgs, config: &config::Config, color_choice: ColorChoice) -> i32 {
    let source = normalize(&read_source(&args.file));

    // Diagnostics point into the normalized text, which is what the parser sees
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let parsed = match blocklang::Parser::new(source.clone(), file_id).parse() {
        Ok(parsed) => parsed,
        Err(errors) => {
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            for error in &errors {
                let diagnostic = error.to_diagnostic();
                let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            }
            return 1;
        }
    };

    if args.ast {
        println!("{:#?}", parsed.nodes);
        return 0;
    }

    let mut block = new_block(config);
    let mut graph = MemoryGraph::new();
    if let Err(e) = block.set_code(&source, &mut graph, &mut UndoLog::new()) {
        eprintln!("error: {}", e);
        return 1;
    }

    if args.statements {
        print_statements(block.statements(), 0);
        return 0;
    }

    print_ports("inputs", block.input_ports());
    print_ports("outputs", block.output_ports());
    0
}

fn do_rebuild(args: RebuildArgs, config: &config::Config) -> i32 {
    let old = read_source(&args.old);
    let new = read_source(&args.new);

    let mut block = new_block(config);
    let mut graph = MemoryGraph::new();
    let mut undo = UndoLog::new();

    if let Err(e) = block.set_code(&old, &mut graph, &mut undo) {
        eprintln!("error: {}: {}", args.old, e);
        return 1;
    }
    wire_every_port(&mut graph, PortSide::Input, block.input_ports());
    wire_every_port(&mut graph, PortSide::Output, block.output_ports());

    let result = block.set_code(&new, &mut graph, &mut undo);

    print_ports("inputs", block.input_ports());
    print_ports("outputs", block.output_ports());
    println!("wires:");
    for wire in graph.wires() {
        let side = match wire.side {
            PortSide::Input => "in",
            PortSide::Output => "out",
        };
        println!("  {} {} <- {}:{}", side, wire.port, wire.remote.node, wire.remote.port);
    }
    let reconnection = block.last_reconnection();
    for (side, report) in [("inputs", reconnection.inputs), ("outputs", reconnection.outputs)] {
        println!(
            "{}: {} exact, {} positional, {} leftover, {} dropped",
            side, report.exact, report.positional, report.leftover, report.dropped
        );
    }
    println!("undo entries: {}", undo.groups().len());

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {}: {}", args.new, e);
            1
        }
    }
}

/// Attach one remote endpoint, named after the port, to each port.
fn wire_every_port(graph: &mut MemoryGraph, side: PortSide, ports: &[PortSpec]) {
    for (index, port) in ports.iter().enumerate() {
        graph.connect(side, index, Endpoint::new(port.display_name.clone(), 0));
    }
}

fn print_ports(title: &str, ports: &[PortSpec]) {
    println!("{}:", title);
    for port in ports {
        match port.vertical_offset {
            Some(offset) => println!("  {} (+{})", port.display_name, offset),
            None => println!("  {}", port.display_name),
        }
    }
}

fn print_statements(statements: &[Statement], indent: usize) {
    let pad = "  ".repeat(indent);
    for statement in statements {
        let defined: Vec<&str> = statement.defined_variables().iter().map(|v| v.name()).collect();
        let referenced: Vec<&str> = statement.referenced_variables().iter().map(|v| v.name()).collect();
        println!(
            "{}{:?} lines {}-{} defines [{}] reads [{}]",
            pad,
            statement.kind(),
            statement.start_line(),
            statement.end_line(),
            defined.join(", "),
            referenced.join(", ")
        );
        print_statements(statement.sub_statements(), indent + 1);
    }
}
