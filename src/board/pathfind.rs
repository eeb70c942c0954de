//! Reachability search for the driving phase.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::board::{EdgeKey, GridError, HexGrid, PlayerId};
use crate::coords::TilePosition;

#[derive(Clone, Copy, PartialEq, Eq)]
struct Best {
    cost: u64,
    hops: u32,
}

/// Every tile reachable from `from` over built rails, mapped to one
/// minimal-cost path (starting at `from`, ending at the tile). Crossing a
/// foreign rail adds its renting cost on top of the driving cost. Ties are
/// broken by fewer hops, then by position order, so the result is
/// reproducible. `from` itself is never a key; with no traversable edges the
/// map is empty.
pub fn drivable_tiles(
    grid: &HexGrid,
    player: PlayerId,
    from: TilePosition,
) -> HashMap<TilePosition, Vec<TilePosition>> {
    let mut best: HashMap<TilePosition, Best> =
        HashMap::from([(from, Best { cost: 0, hops: 0 })]);
    let mut prev: HashMap<TilePosition, TilePosition> = HashMap::new();
    let mut heap: BinaryHeap<Reverse<(u64, u32, TilePosition)>> = BinaryHeap::new();
    heap.push(Reverse((0, 0, from)));

    while let Some(Reverse((cost, hops, position))) = heap.pop() {
        if best
            .get(&position)
            .is_some_and(|settled| (settled.cost, settled.hops) < (cost, hops))
        {
            continue;
        }
        for key in grid.edges_at(position) {
            let Some(edge) = grid.edge_by_key(&key) else {
                continue;
            };
            if !edge.has_rail() {
                continue;
            }
            let Some(next) = key.other_endpoint(position) else {
                continue;
            };
            let Ok(drive) = grid.driving_cost(&key, position) else {
                continue;
            };
            let rent: u32 = grid.renting_cost(&key, player).values().sum();
            let next_cost = cost + u64::from(drive + rent);
            let next_hops = hops + 1;
            let improves = match best.get(&next) {
                None => true,
                Some(settled) => (next_cost, next_hops) < (settled.cost, settled.hops),
            };
            if improves {
                best.insert(
                    next,
                    Best {
                        cost: next_cost,
                        hops: next_hops,
                    },
                );
                prev.insert(next, position);
                heap.push(Reverse((next_cost, next_hops, next)));
            }
        }
    }

    let mut result = HashMap::new();
    for position in best.keys() {
        if *position == from {
            continue;
        }
        let mut path = vec![*position];
        let mut cursor = *position;
        while let Some(parent) = prev.get(&cursor) {
            path.push(*parent);
            cursor = *parent;
            if cursor == from {
                break;
            }
        }
        path.reverse();
        result.insert(*position, path);
    }
    result
}

/// Total cost of driving the given tile sequence: driving cost plus rent for
/// every traversed rail. Fails when consecutive tiles are not adjacent or a
/// segment has no rail built.
pub fn path_cost(
    grid: &HexGrid,
    player: PlayerId,
    path: &[TilePosition],
) -> Result<u64, GridError> {
    let mut total: u64 = 0;
    for segment in path.windows(2) {
        let key = EdgeKey::new(segment[0], segment[1])?;
        let edge = grid
            .edge_by_key(&key)
            .ok_or(GridError::UnknownEdge(segment[0], segment[1]))?;
        if !edge.has_rail() {
            return Err(GridError::NoRail(segment[0], segment[1]));
        }
        let drive = grid.driving_cost(&key, segment[0])?;
        let rent: u32 = grid.renting_cost(&key, player).values().sum();
        total += u64::from(drive + rent);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{City, HexGrid, Terrain, Tile};

    fn line_grid(length: i32) -> HexGrid {
        let tiles = (0..length).map(|q| Tile {
            position: TilePosition::new(q, 0),
            terrain: Terrain::Plain,
        });
        let cities = vec![City {
            position: TilePosition::new(0, 0),
            name: "Aachen".to_string(),
            is_starting_city: true,
        }];
        HexGrid::from_parts(tiles, cities).unwrap()
    }

    fn pos(q: i32) -> TilePosition {
        TilePosition::new(q, 0)
    }

    fn rail(grid: &mut HexGrid, q1: i32, q2: i32, player: PlayerId) {
        let key = EdgeKey::new(pos(q1), pos(q2)).unwrap();
        assert!(grid.add_rail(&key, player));
    }

    #[test]
    fn no_rails_means_nothing_drivable() {
        let grid = line_grid(4);
        assert!(drivable_tiles(&grid, 0, pos(0)).is_empty());
    }

    #[test]
    fn paths_walk_from_start_to_destination() {
        let mut grid = line_grid(4);
        rail(&mut grid, 0, 1, 0);
        rail(&mut grid, 1, 2, 0);
        rail(&mut grid, 2, 3, 0);

        let drivable = drivable_tiles(&grid, 0, pos(0));
        assert!(!drivable.contains_key(&pos(0)));
        assert_eq!(drivable.len(), 3);
        assert_eq!(drivable[&pos(3)], vec![pos(0), pos(1), pos(2), pos(3)]);
        assert_eq!(path_cost(&grid, 0, &drivable[&pos(3)]), Ok(3));
    }

    #[test]
    fn foreign_rails_cost_rent() {
        let mut grid = line_grid(3);
        rail(&mut grid, 0, 1, 0);
        rail(&mut grid, 1, 2, 0);

        let owner = drivable_tiles(&grid, 0, pos(0));
        let renter = drivable_tiles(&grid, 1, pos(0));
        assert_eq!(owner.len(), renter.len());
        assert_eq!(path_cost(&grid, 0, &owner[&pos(2)]), Ok(2));
        // One foreign owner per edge: 1 credit rent on top of each step.
        assert_eq!(path_cost(&grid, 1, &renter[&pos(2)]), Ok(4));
    }

    #[test]
    fn unbuilt_segments_are_rejected() {
        let mut grid = line_grid(3);
        rail(&mut grid, 0, 1, 0);
        let path = vec![pos(0), pos(1), pos(2)];
        assert!(matches!(
            path_cost(&grid, 0, &path),
            Err(GridError::NoRail(_, _))
        ));
        let broken = vec![pos(0), pos(2)];
        assert!(matches!(
            path_cost(&grid, 0, &broken),
            Err(GridError::NotAdjacent(_, _))
        ));
    }

    #[test]
    fn search_is_deterministic() {
        let mut grid = line_grid(5);
        for q in 0..4 {
            rail(&mut grid, q, q + 1, 0);
        }
        let first = drivable_tiles(&grid, 1, pos(0));
        let second = drivable_tiles(&grid, 1, pos(0));
        assert_eq!(first, second);
    }
}
