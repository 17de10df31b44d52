//! Full pipeline: document in, physics rollouts, checkpoint document out.

use coach::{CheckpointSlot, Coach, Network, RunConfig, Scheduler, TrainConfig};
use morph::BodySpec;
use runtime::{Checkpoint, Document, RandomPolicy};
use sim::CreatureEnv;

const WALKER: &str = "o walker\n\
s 0.01 4 50 -9.81 10 0.8 0.8 0 0\n\
c 1 0 0 -10 0 0\n\
l 1 0.1 0.1 0.1 0 3 0 0 0 0 1\n\
p 0 0 0 0 0 0 1\n\
l 0.5 0.05 0.05 0.05 0 4.2 0 0 0 0 1\n\
p 0 0 0 0 0 0 1\n\
j 0 1 -45 45 100 0 3.6 0 0 0 0 1\n\
b 0\n";

#[test]
fn short_run_writes_an_output_document() {
    let document = Document {
        shape_data: WALKER.to_owned(),
        config: TrainConfig {
            random_steps: 0,
            batch_size: 8,
            buffer_capacity: 1000,
            ..TrainConfig::default()
        },
        checkpoint: None,
    };
    let input = std::env::temp_dir().join("ambler_pipeline.json");
    document.save(&input).unwrap();

    let loaded = Document::load(&input).unwrap();
    let spec = BodySpec::parse(&loaded.shape_data).unwrap();
    let mut network = RandomPolicy::new(spec.action_len(), 9);
    let slot = CheckpointSlot::new(network.snapshot());
    let train = loaded.config.clone();
    let mut actors = vec![Coach::new(CreatureEnv::new(spec).unwrap(), &train, 1)];
    let run = RunConfig {
        epochs: 2,
        epoch_steps: 30,
        training_start_steps: 10,
        training_interval: 10,
    };
    let mut scheduler = Scheduler::new(train, run, 3);

    let output = Document::output_path(&input);
    let mut result_document = loaded;
    scheduler
        .run(&mut actors, &mut network, &slot, |stats, network| {
            result_document.checkpoint = Some(Checkpoint {
                data: network.save(),
                time: u64::from(stats.epoch),
            });
            result_document.save(&output).unwrap();
        })
        .unwrap();

    assert_eq!(scheduler.total_steps(), 60);
    let written = Document::load(&output).unwrap();
    assert!(written.checkpoint.is_some());
    assert_eq!(written.shape_data, WALKER);

    std::fs::remove_file(&input).ok();
    std::fs::remove_file(&output).ok();
}
