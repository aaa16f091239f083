//! Structural properties every generated maze must satisfy, checked over a
//! spread of sizes including the 1- and 255-cell extremes.

use std::collections::VecDeque;

use mazerace_maze::{Direction, Maze, Position};
use rand::SeedableRng;
use rand::rngs::StdRng;

const SIZES: &[(u8, u8)] = &[
    (1, 1),
    (1, 2),
    (2, 1),
    (1, 255),
    (255, 1),
    (2, 2),
    (3, 7),
    (10, 20),
    (31, 17),
    (64, 64),
    (255, 255),
];

fn generate(rows: u8, columns: u8, seed: u64) -> Maze {
    Maze::generate_with_rng(rows, columns, &mut StdRng::seed_from_u64(seed))
        .expect("non-zero dimensions")
}

/// Breadth-first walk from the start cell following open sides only.
fn reachable_from_start(maze: &Maze) -> usize {
    let rows = maze.rows();
    let columns = maze.columns();
    let mut seen = vec![false; usize::from(rows) * usize::from(columns)];
    let mut queue = VecDeque::from([maze.start()]);
    seen[0] = true;
    let mut count = 1;

    while let Some(here) = queue.pop_front() {
        let cell = maze.cell(here).expect("in bounds");
        for dir in cell.open_directions() {
            let Some(next) = here.step(dir, rows, columns) else {
                continue;
            };
            let idx = usize::from(next.row) * usize::from(columns) + usize::from(next.column);
            if !seen[idx] {
                seen[idx] = true;
                count += 1;
                queue.push_back(next);
            }
        }
    }
    count
}

#[test]
fn test_generated_mazes_span_every_cell() {
    for (seed, &(rows, columns)) in SIZES.iter().enumerate() {
        let maze = generate(rows, columns, seed as u64);
        assert_eq!(
            reachable_from_start(&maze),
            usize::from(rows) * usize::from(columns),
            "{rows}x{columns} maze has unreachable cells"
        );
    }
}

#[test]
fn test_generated_mazes_have_no_cycles() {
    // A connected graph with V-1 edges is a tree.
    for (seed, &(rows, columns)) in SIZES.iter().enumerate() {
        let maze = generate(rows, columns, 100 + seed as u64);
        assert_eq!(
            maze.open_passages(),
            usize::from(rows) * usize::from(columns) - 1,
            "{rows}x{columns} maze has the wrong number of passages"
        );
    }
}

#[test]
fn test_generated_walls_are_symmetric() {
    for (seed, &(rows, columns)) in SIZES.iter().enumerate() {
        let maze = generate(rows, columns, 200 + seed as u64);
        for row in 0..rows {
            for column in 0..columns {
                let here = Position::new(row, column);
                let cell = maze.cell(here).unwrap();
                for dir in Direction::ALL {
                    match here.step(dir, rows, columns) {
                        Some(next) => {
                            let back = maze.cell(next).unwrap().is_open(dir.opposite());
                            assert_eq!(
                                cell.is_open(dir),
                                back,
                                "asymmetric wall between {here} and {next}"
                            );
                        }
                        None => assert!(
                            !cell.is_open(dir),
                            "{here} is open toward the outside ({dir})"
                        ),
                    }
                }
            }
        }
    }
}

#[test]
fn test_every_open_side_is_a_valid_move() {
    let maze = generate(12, 9, 42);
    for row in 0..maze.rows() {
        for column in 0..maze.columns() {
            let here = Position::new(row, column);
            for dir in Direction::ALL {
                let Some(next) = here.step(dir, maze.rows(), maze.columns()) else {
                    continue;
                };
                let open = maze.cell(here).unwrap().is_open(dir);
                assert_eq!(maze.is_valid_move(here, next), open);
            }
        }
    }
}

#[test]
fn test_different_seeds_produce_different_mazes() {
    let a = generate(10, 20, 1);
    let b = generate(10, 20, 2);
    assert_ne!(a, b, "two seeds produced the same 10x20 maze");
}
