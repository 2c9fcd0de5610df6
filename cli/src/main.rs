use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;
use clap::Parser;
use drs_core::{Context, Value};
use tracing_subscriber::EnvFilter;

mod repl;

#[derive(Debug, Parser)]
#[command(
    name = "drs",
    version,
    about = "Evaluate dice-script expressions",
    long_about = "Evaluates a dice-script expression, or opens a REPL when no \
                  expression is given. Variables assigned during a session are \
                  kept for later inputs."
)]
struct Cli {
    /// Expression to evaluate; omit to open the REPL.
    expr: Option<String>,

    /// Resolve every die at its minimum face.
    #[arg(long)]
    min: bool,

    /// Resolve every die at its maximum face.
    #[arg(long)]
    max: bool,

    /// Default face count for bare `Nd` rolls.
    #[arg(long, value_name = "N")]
    faces: Option<i64>,

    /// Print the compiled bytecode to stderr before executing.
    #[arg(long)]
    bytecode: bool,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut ctx = session_context(&cli);

    match &cli.expr {
        Some(expr) => match ctx.run(expr) {
            Ok(value) => {
                println!("{}", render(&value, cli.json)?);
                if !ctx.rest_input.is_empty() {
                    eprintln!("unparsed tail: {:?}", ctx.rest_input);
                }
                Ok(())
            }
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        },
        None => repl::run(ctx, cli.json),
    }
}

fn render(value: &Value, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string(value)?)
    } else {
        Ok(value.to_string())
    }
}

/// A context whose variables persist in a session-local map.
fn session_context(cli: &Cli) -> Context {
    let mut ctx = Context::new();
    ctx.flags.dice_min_mode = cli.min;
    ctx.flags.dice_max_mode = cli.max;
    ctx.flags.print_bytecode = cli.bytecode;
    if let Some(faces) = cli.faces {
        ctx.flags.default_dice_side_num = faces;
    }

    let vars: Rc<RefCell<HashMap<String, Value>>> = Rc::new(RefCell::new(HashMap::new()));
    let store = vars.clone();
    ctx.value_store_name_func = Some(Rc::new(RefCell::new(move |name: &str, value: Value| {
        store.borrow_mut().insert(name.to_string(), value);
    })));
    let load = vars;
    ctx.value_load_name_func = Some(Rc::new(RefCell::new(move |name: &str| {
        load.borrow().get(name).cloned()
    })));
    ctx
}
