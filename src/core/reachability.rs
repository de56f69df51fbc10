//! Breadth-first reachability over the maze grid.
//!
//! Only existence of a route is answered here. Move-efficiency scoring uses a
//! Manhattan estimate instead of BFS distance (see `scoring::optimal_moves`).

use std::collections::VecDeque;

use crate::maze::{CellKind, KindSet, Maze, Position};

/// Kinds a generated maze must connect the start and exit through.
pub const GENERATION: KindSet = KindSet::of(&[CellKind::Path, CellKind::Door, CellKind::Exit]);

/// `GENERATION` plus already-placed pick-ups, so placing one item never hides
/// cells from the next placement pass.
pub const PLACEMENT: KindSet = GENERATION
    .with(CellKind::CrystalBall)
    .with(CellKind::Map)
    .with(CellKind::KeyPowerup);

pub fn reachable(maze: &Maze, start: Position, end: Position, traversable: KindSet) -> bool {
    if !maze.contains(start) || !maze.contains(end) {
        return false;
    }
    if start == end {
        return true;
    }

    let w = maze.width() as usize;
    let mut visited = vec![false; w * maze.height() as usize];
    let mut queue = VecDeque::new();
    visited[start.y as usize * w + start.x as usize] = true;
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        for n in maze.neighbors(pos) {
            let i = n.y as usize * w + n.x as usize;
            if visited[i] {
                continue;
            }
            match maze.kind_at(n) {
                Some(kind) if traversable.contains(kind) => {}
                _ => continue,
            }
            if n == end {
                return true;
            }
            visited[i] = true;
            queue.push_back(n);
        }
    }

    false
}

/// Every cell reachable from `start` (inclusive), in BFS order.
pub fn reachable_from(maze: &Maze, start: Position, traversable: KindSet) -> Vec<Position> {
    if !maze.contains(start) {
        return Vec::new();
    }

    let w = maze.width() as usize;
    let mut visited = vec![false; w * maze.height() as usize];
    let mut order = vec![start];
    let mut queue = VecDeque::from([start]);
    visited[start.y as usize * w + start.x as usize] = true;

    while let Some(pos) = queue.pop_front() {
        for n in maze.neighbors(pos) {
            let i = n.y as usize * w + n.x as usize;
            if visited[i] || !maze.kind_at(n).is_some_and(|k| traversable.contains(k)) {
                continue;
            }
            visited[i] = true;
            order.push(n);
            queue.push_back(n);
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::Cell;

    fn corridor(middle: Cell) -> Maze {
        Maze::from_rows(vec![
            vec![Cell::Wall; 5],
            vec![Cell::Start, Cell::Path, middle, Cell::Path, Cell::Exit],
            vec![Cell::Wall; 5],
        ])
        .unwrap()
    }

    #[test]
    fn doors_count_as_open_for_generation() {
        let maze = corridor(Cell::Door);
        assert!(reachable(&maze, maze.start_entry(), maze.exit_entry(), GENERATION));
        assert!(reachable(&maze, maze.start_entry(), maze.exit(), GENERATION));
    }

    #[test]
    fn walls_and_traps_block() {
        let maze = corridor(Cell::Wall);
        assert!(!reachable(&maze, maze.start_entry(), maze.exit_entry(), GENERATION));

        let trapped = corridor(Cell::Trap {
            style: crate::maze::TrapStyle::Pit,
        });
        assert!(!reachable(
            &trapped,
            trapped.start_entry(),
            trapped.exit_entry(),
            GENERATION
        ));
    }

    #[test]
    fn placement_set_walks_over_pickups() {
        let maze = corridor(Cell::Map);
        assert!(!reachable(&maze, maze.start_entry(), maze.exit_entry(), GENERATION));
        assert!(reachable(&maze, maze.start_entry(), maze.exit_entry(), PLACEMENT));
    }

    #[test]
    fn start_equals_end_and_out_of_bounds() {
        let maze = corridor(Cell::Path);
        let p = maze.start_entry();
        assert!(reachable(&maze, p, p, GENERATION));
        assert!(!reachable(&maze, p, Position::new(40, 40), GENERATION));
    }

    #[test]
    fn region_lists_reachable_cells() {
        let maze = corridor(Cell::Wall);
        let region = reachable_from(&maze, maze.start_entry(), GENERATION);
        assert_eq!(region, vec![Position::new(1, 1)]);

        let open = corridor(Cell::Path);
        let region = reachable_from(&open, open.start_entry(), GENERATION);
        assert_eq!(region.len(), 4);
        assert_eq!(region.last(), Some(&open.exit()));
    }
}
