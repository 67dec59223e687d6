use clap::{Parser, ValueEnum};

use symex_rs::analysis::{Analysis, Config};
use symex_rs::ir::{BinOp, CmpOp, FieldRef, Method, Operand, Rvalue, Stmt, Type};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Sample {
    /// Branch joining into a single return.
    Diamond,
    /// Summation loop.
    Sum,
    /// Loop writing a field on every iteration.
    Fill,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Method to analyse.
    #[arg(value_enum, default_value = "sum")]
    sample: Sample,

    /// Expression table size (in bits, so the table has `2^size` buckets).
    #[clap(long, value_name = "INT", default_value = "16")]
    size: usize,

    /// Print the analysed control-flow graph in DOT format.
    #[clap(long)]
    dot: bool,

    /// Enable debug logging.
    #[clap(short, long)]
    verbose: bool,
}

fn local(name: &str) -> Operand {
    Operand::local(name)
}

fn add(lhs: &str, a: Operand, b: Operand) -> Stmt {
    Stmt::assign(lhs, Rvalue::Binary(BinOp::Add, a, b))
}

fn build(sample: Sample) -> symex_rs::Result<Method> {
    match sample {
        Sample::Diamond => Method::builder("Demo", "diamond")
            .param("input", Type::Int)
            .local("test", Type::Int)
            .returns(Type::Int)
            .stmts([
                add("test", local("input"), Operand::Int(1)),
                Stmt::branch(CmpOp::Eq, local("test"), Operand::Int(42), 4),
                add("test", local("test"), Operand::Int(3)),
                Stmt::goto(5),
                add("test", local("test"), Operand::Int(2)),
                Stmt::Return(Some(local("test"))),
            ])
            .build(),
        Sample::Sum => Method::builder("Demo", "sum")
            .param("n", Type::Int)
            .local("i", Type::Int)
            .local("s", Type::Int)
            .returns(Type::Int)
            .stmts([
                Stmt::assign("i", Rvalue::Use(Operand::Int(0))),
                Stmt::assign("s", Rvalue::Use(Operand::Int(0))),
                Stmt::branch(CmpOp::Ge, local("i"), local("n"), 6),
                add("s", local("s"), local("i")),
                add("i", local("i"), Operand::Int(1)),
                Stmt::goto(2),
                Stmt::Return(Some(local("s"))),
            ])
            .build(),
        Sample::Fill => Method::builder("Node", "fill")
            .param("o", Type::object("Node"))
            .param("n", Type::Int)
            .stmts([
                Stmt::branch(CmpOp::Le, local("n"), Operand::Int(0), 4),
                Stmt::WriteField {
                    base: local("o"),
                    field: FieldRef::new("Node", "val", Type::Int),
                    value: local("n"),
                },
                Stmt::assign("n", Rvalue::Binary(BinOp::Sub, local("n"), Operand::Int(1))),
                Stmt::goto(0),
                Stmt::Return(None),
            ])
            .build(),
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    println!("args = {:?}", args);

    let method = build(args.sample)?;
    println!("method = {}", method.signature());
    for (i, stmt) in method.body.iter().enumerate() {
        println!("  {:>3}: {}", i, stmt);
    }

    let config = Config {
        storage_bits: args.size,
        ..Config::default()
    };
    let time_total = std::time::Instant::now();
    let mut analysis = Analysis::with_config(method, config)?;
    analysis.execute()?;
    println!("analysis = {:?}", analysis);

    let ctx = analysis.context();
    for (id, summary) in analysis.loop_summaries() {
        println!(
            "loop {} at {} after {} passes: {}",
            id,
            summary.head,
            summary.passes,
            summary.leaf.display(ctx)
        );
        println!("  modifies {}", ctx.display(summary.modifies));
    }
    for (stmt, states) in analysis.leaves() {
        for state in states {
            println!("leaf {}: {}", stmt, state.display(ctx));
        }
    }

    if args.dot {
        println!("{}", analysis.to_dot()?);
    }

    println!("\nAll done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
