use std::sync::Arc;

use ptsp_core::{replay, replay_with_checkpoints, ActionLog, Checkpoint, TileMap};

const MAZE: &str = "\
scale=6
############
#S...#.....#
#.W..#..W..#
#....D.....#
#..F....LL.#
#....E..W..#
############
";

fn maze() -> Arc<TileMap> {
    Arc::new(TileMap::parse(MAZE).expect("fixture map should parse"))
}

/// A fixed pseudo-random action stream; no RNG crate needed for a fixture.
fn scripted_actions(len: usize) -> Vec<u8> {
    let mut state = 0x9E37_79B9u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 6) as u8
        })
        .collect()
}

fn mix_u64(hash: u64, value: u64) -> u64 {
    // FNV-1a style mix for stable fingerprinting.
    hash.wrapping_mul(0x0000_0100_0000_01B3) ^ value
}

fn checkpoint_fingerprint(checkpoints: &[Checkpoint]) -> u64 {
    let mut hash = 0xCBF2_9CE4_8422_2325u64;

    for checkpoint in checkpoints {
        hash = mix_u64(hash, checkpoint.tick as u64);
        hash = mix_u64(hash, checkpoint.position.x.to_bits());
        hash = mix_u64(hash, checkpoint.position.y.to_bits());
        hash = mix_u64(hash, checkpoint.velocity.x.to_bits());
        hash = mix_u64(hash, checkpoint.velocity.y.to_bits());
        hash = mix_u64(hash, checkpoint.facing.x.to_bits());
        hash = mix_u64(hash, checkpoint.facing.y.to_bits());
        hash = mix_u64(hash, checkpoint.fuel as u64);
        hash = mix_u64(hash, checkpoint.damage as u64);
        hash = mix_u64(hash, checkpoint.waypoints_visited as u64);
        hash = mix_u64(hash, checkpoint.fuel_tanks_collected as u64);
    }

    hash
}

#[test]
fn checkpoints_bracket_the_whole_replay() {
    let actions = scripted_actions(1_000);
    let checkpoints = replay_with_checkpoints(maze(), &actions, 64).expect("replay");

    assert_eq!(checkpoints.first().expect("checkpoint").tick, 0);
    let last = checkpoints.last().expect("checkpoint");
    let final_state = replay(maze(), &actions).expect("replay").checkpoint();
    assert_eq!(*last, final_state);
    // Initial state, one per stride, plus the trailing partial stride.
    assert_eq!(checkpoints.len(), 1 + 1_000 / 64 + 1);
}

#[test]
fn checkpoint_fingerprint_is_stable_across_runs() {
    let actions = scripted_actions(2_500);
    let first = replay_with_checkpoints(maze(), &actions, 50).expect("replay");
    let second = replay_with_checkpoints(maze(), &actions, 50).expect("replay");

    assert_eq!(
        checkpoint_fingerprint(&first),
        checkpoint_fingerprint(&second)
    );
}

#[test]
fn replay_ignores_ticks_after_the_game_ends() {
    let map = Arc::new(TileMap::parse("scale=4\n#####\n#SW.#\n#####").expect("map parses"));
    let finished = replay(Arc::clone(&map), &[3]).expect("replay");
    assert!(finished.is_ended());

    let mut actions = vec![3];
    actions.extend(scripted_actions(300));
    let padded = replay(map, &actions).expect("replay");
    assert_eq!(padded.elapsed_ticks(), 1);
    assert_eq!(padded.checkpoint(), finished.checkpoint());
}

#[test]
fn action_log_file_replays_to_the_recorded_state() -> Result<(), Box<dyn std::error::Error>> {
    let actions = scripted_actions(600);
    let final_state = replay(maze(), &actions)?.checkpoint();
    let log = ActionLog::new("maze", actions).with_final_state(final_state);

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("maze.actions.json");
    std::fs::write(&path, log.to_json_pretty()?)?;

    let loaded = ActionLog::from_json(&std::fs::read(&path)?)?;
    let game = loaded.verify(maze())?;
    assert_eq!(game.checkpoint(), final_state);
    Ok(())
}
