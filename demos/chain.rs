use anyhow::{anyhow, Result};
use clap::Parser;
use log::debug;
use pledge::{rethrow, task::Executor, Value};

/// Build a long chain of futures, each adopting the previous one, then push a
/// value through a then/catch pipeline at the end of it.
#[derive(Parser)]
struct Args {
    /// Number of futures in the adoption chain.
    #[arg(short, long, default_value_t = 10_000)]
    depth: usize,

    /// Reject the root of the chain instead of fulfilling it.
    #[arg(short, long)]
    fail: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let exec = Executor::with_capacity(args.depth);
    let rt = exec.runtime();

    let root = rt.deferred();
    let mut tip = root.future.clone();

    for _ in 0..args.depth {
        let link = rt.deferred();
        link.resolve.call(tip);
        tip = link.future;
    }

    debug!("Built a chain of {} futures", args.depth);

    let result = tip
        .then(
            |v| Ok(Value::from(format!("fulfilled with {v}"))),
            rethrow,
        )
        .catch(|reason| Ok(Value::from(format!("recovered from {reason}"))));

    if args.fail {
        root.reject.call("root rejected");
    } else {
        root.resolve.call(args.depth);
    }

    match exec.block_on(result)? {
        Ok(value) => println!("{value}"),
        Err(reason) => return Err(anyhow!("chain rejected: {reason}")),
    }

    Ok(())
}
