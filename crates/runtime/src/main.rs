#![deny(clippy::all, clippy::pedantic)]

//! Trainer binary. Loads a training document, builds one creature
//! environment per actor and runs the epoch schedule, writing a fresh
//! checkpoint document after every epoch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use coach::{CheckpointSlot, Coach, Network, RunConfig, Scheduler};
use morph::BodySpec;
use runtime::{Checkpoint, Document, RandomPolicy, Tester};
use sim::{CreatureEnv, Env};

#[derive(Parser)]
#[command(name = "ambler", about = "Trains articulated creatures to walk toward moving goals")]
struct Args {
    /// Training document (JSON)
    input: PathBuf,
    /// Number of parallel rollout actors
    #[arg(long, default_value_t = 1)]
    actors: usize,
    /// Play evaluation episodes on a side thread while training
    #[arg(long)]
    test: bool,
    /// Play one random-policy episode, printing every step, and exit
    #[arg(long)]
    print: bool,
    /// Override the number of epochs
    #[arg(long)]
    epochs: Option<u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    run(&Args::parse())
}

fn run(args: &Args) -> Result<()> {
    let mut document = Document::load(&args.input)?;
    let spec = BodySpec::parse(&document.shape_data).context("parsing body data")?;

    if args.print {
        return trace_episode(&spec);
    }

    let seed = fastrand::u64(..);
    let train = document.config.clone();
    let mut run_config = RunConfig::default();
    if let Some(epochs) = args.epochs {
        run_config.epochs = epochs;
    }

    let mut network = RandomPolicy::new(spec.action_len(), seed);
    if let Some(checkpoint) = &document.checkpoint {
        network.restore(&checkpoint.data);
    }
    let slot = Arc::new(CheckpointSlot::new(network.snapshot()));

    let actor_count = args.actors.max(1);
    let mut actors = Vec::with_capacity(actor_count);
    for index in 0..actor_count {
        let env = CreatureEnv::new(spec.clone()).context("building environment")?;
        actors.push(Coach::new(env, &train, seed.wrapping_add(index as u64)));
    }

    let tester = if args.test {
        let env = CreatureEnv::new(spec.clone()).context("building evaluation environment")?;
        Some(Tester::spawn(env, Arc::clone(&slot)))
    } else {
        None
    };

    tracing::info!(
        name = %spec.name,
        actors = actor_count,
        epochs = run_config.epochs,
        "training"
    );

    let output = Document::output_path(&args.input);
    let mut scheduler = Scheduler::new(train, run_config, seed);
    let result = scheduler.run(&mut actors, &mut network, &slot, |_, network| {
        document.checkpoint = Some(Checkpoint {
            data: network.save(),
            time: unix_millis(),
        });
        if let Err(error) = document.save(&output) {
            tracing::warn!(%error, "failed to save checkpoint");
        }
    });

    if let Some(tester) = tester {
        tester.stop();
    }
    result.context("training run failed")
}

/// One episode under the stand-in policy, every step on stdout.
fn trace_episode(spec: &BodySpec) -> Result<()> {
    let mut env = CreatureEnv::new(spec.clone()).context("building environment")?;
    let policy = RandomPolicy::new(spec.action_len(), fastrand::u64(..));
    env.restart();

    let mut total = 0.0;
    while !env.done() && !env.timeout() {
        let action = policy.predict(env.observation());
        let reward = env.step(&action).context("stepping environment")?;
        total += reward;
        println!(
            "move {:4}  reward {reward:9.4}  action {action:?}  observation {:?}",
            env.move_number(),
            env.observation()
        );
    }
    println!("episode reward: {total:.4}");
    Ok(())
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
