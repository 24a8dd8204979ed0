use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ptsp_core::TileMap;

/// Prefix for map ids that name a file instead of a built-in map.
pub const FILE_PREFIX: &str = "file:";

#[derive(Clone, Copy, Debug)]
pub struct BuiltinMap {
    pub id: &'static str,
    pub description: &'static str,
    pub text: &'static str,
}

// One drawing cell is ten tiles, wide enough for a lattice node to fit a
// ship-sized disc inside a one-cell corridor.
fn builtin_maps() -> &'static [BuiltinMap] {
    &[
        BuiltinMap {
            id: "open",
            description: "Walled arena with scattered waypoints and one fuel tank.",
            text: "\
scale=10
############
#S.........#
#...W...W..#
#..........#
#.W....F...#
#.......W..#
#...W......#
############
",
        },
        BuiltinMap {
            id: "rooms",
            description: "Four rooms joined by doorways; order matters.",
            text: "\
scale=10
##############
#S...#...W...#
#....#.......#
#.W..........#
#....#....F..#
###.######.###
#...W#.......#
#....#...W...#
#.........W..#
##############
",
        },
        BuiltinMap {
            id: "maze",
            description: "One-cell corridors with dead ends and tight turns.",
            text: "\
scale=10
#############
#S....#....W#
#.###.#.###.#
#.#W..#...#.#
#.#####.#.#.#
#.......#..W#
#.#####.#####
#...F.....W.#
#############
",
        },
        BuiltinMap {
            id: "hazards",
            description: "Open field with damaging and elastic walls and lava strips.",
            text: "\
scale=10
##############
#S....L......#
#.....L...W..#
#..DDDD...E..#
#.........E..#
#.W..F....E..#
#....LLL.....#
#.......W....#
##############
",
        },
    ]
}

pub fn map_ids() -> Vec<&'static str> {
    builtin_maps().iter().map(|map| map.id).collect()
}

pub fn describe_maps() -> Vec<(&'static str, &'static str)> {
    builtin_maps()
        .iter()
        .map(|map| (map.id, map.description))
        .collect()
}

pub fn builtin_map(id: &str) -> Option<&'static BuiltinMap> {
    builtin_maps().iter().find(|map| map.id == id)
}

/// Resolves a built-in id or a `file:<path>` id to a parsed map.
pub fn load_map(id: &str) -> Result<TileMap> {
    if let Some(path) = id.strip_prefix(FILE_PREFIX) {
        return load_map_file(Path::new(path));
    }

    let builtin = builtin_map(id).ok_or_else(|| {
        anyhow!(
            "unknown map id '{id}'; available: {} (or {FILE_PREFIX}<path>)",
            map_ids().join(", ")
        )
    })?;
    TileMap::parse(builtin.text).with_context(|| format!("built-in map '{id}' is malformed"))
}

pub fn load_map_file(path: &Path) -> Result<TileMap> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading map file {}", path.display()))?;
    TileMap::parse(&text).with_context(|| format!("failed parsing map file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ptsp_core::{PathGraph, RouteOracle};

    use super::*;
    use crate::config::DEFAULT_GRAPH_SPACING;

    #[test]
    fn every_builtin_map_parses_with_waypoints() {
        for id in map_ids() {
            let map = load_map(id).expect("built-in map parses");
            assert!(!map.waypoints().is_empty(), "{id} has no waypoints");
        }
        assert_eq!(map_ids().len(), describe_maps().len());
    }

    #[test]
    fn every_builtin_waypoint_is_reachable_from_the_start() {
        for id in map_ids() {
            let map = load_map(id).expect("built-in map parses");
            let graph = PathGraph::build(&map, DEFAULT_GRAPH_SPACING);
            for waypoint in map.waypoints() {
                assert!(
                    graph.route_cost(map.start(), *waypoint).is_ok(),
                    "{id}: no route to {waypoint}"
                );
            }
        }
    }

    #[test]
    fn unknown_ids_list_the_alternatives() {
        let err = load_map("nowhere").expect_err("unknown id").to_string();
        assert!(err.contains("maze"));
        assert!(err.contains(FILE_PREFIX));
    }

    #[test]
    fn file_ids_load_from_disk() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "scale=5\n#####\n#SW.#\n#####")?;

        let map = load_map(&format!("{FILE_PREFIX}{}", file.path().display()))?;
        assert_eq!(map.width(), 25);
        assert_eq!(map.waypoints().len(), 1);

        assert!(load_map(&format!("{FILE_PREFIX}/definitely/not/here.map")).is_err());
        Ok(())
    }
}
