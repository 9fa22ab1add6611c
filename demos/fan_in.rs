use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use pledge::{task::Executor, Value};

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Race,
    All,
}

/// Combine a set of deferred futures with race or all, settling them in the
/// order given on the command line.
#[derive(Parser)]
struct Args {
    #[arg(value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Settlement order: indices into the inputs. Prefix an index with `!`
    /// to reject that input instead of fulfilling it.
    #[arg(short, long, value_delimiter = ',', default_value = "2,0,1")]
    order: Vec<String>,

    /// Number of inputs.
    #[arg(short, long, default_value_t = 3)]
    inputs: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let exec = Executor::new();
    let rt = exec.runtime();

    let inputs: Vec<_> = (0..args.inputs).map(|_| rt.deferred()).collect();
    let list = Value::List(inputs.iter().map(|d| d.future.clone().into()).collect());

    let combined = match args.mode {
        Mode::Race => rt.race(list),
        Mode::All => rt.all(list),
    };

    for step in &args.order {
        let (reject, index) = match step.strip_prefix('!') {
            Some(index) => (true, index),
            None => (false, step.as_str()),
        };

        let index: usize = index.parse()?;
        let input = inputs
            .get(index)
            .ok_or_else(|| anyhow!("no input at index {index}"))?;

        if reject {
            input.reject.call(format!("input {index} failed"));
        } else {
            input.resolve.call(format!("input {index}"));
        }
    }

    match exec.block_on(combined) {
        Ok(Ok(value)) => println!("fulfilled: {value}"),
        Ok(Err(reason)) => println!("rejected: {reason}"),
        Err(e) => println!("{e}"),
    }

    Ok(())
}
