//! Batch compilation: instruction lines → validated moves.
//!
//! Compilation is all-or-nothing. The first failing line rejects the whole
//! batch and no moves are returned, so the caller never persists a partial
//! route.

use crate::core::error::{CompileError, Rejection};
use crate::core::grammar::{Instruction, classify};
use crate::core::movement::advance;
use crate::core::types::{Coord, Heading, LandmarkCatalog, Move};

/// Position and heading threaded through one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub position: Coord,
    /// `None` until a directed move sets it.
    pub heading: Option<Heading>,
}

/// A fully validated batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRoute {
    /// Moves in step order; `moves[0]` is the placement.
    pub moves: Vec<Move>,
    /// Cursor after the last line.
    pub cursor: Cursor,
}

/// Compile a batch of non-blank instruction lines against `catalog`.
pub fn compile_lines<S: AsRef<str>>(
    lines: &[S],
    catalog: &LandmarkCatalog,
) -> Result<CompiledRoute, Rejection> {
    let reject = |line_no: usize, error: CompileError| Rejection {
        line_no,
        line: lines
            .get(line_no)
            .map(|line| line.as_ref().to_string())
            .unwrap_or_default(),
        error,
    };

    let Some(first) = lines.first() else {
        return Err(reject(0, CompileError::malformed("empty instruction batch")));
    };
    let position = match classify(first.as_ref(), 0).map_err(|err| reject(0, err))? {
        Instruction::Start(position) => position,
        _ => {
            return Err(reject(
                0,
                CompileError::malformed("the first instruction must be `start at (X, Y)`"),
            ));
        }
    };
    if position.is_negative() {
        return Err(reject(0, CompileError::NegativeCoordinate { position }));
    }

    let mut cursor = Cursor::placed(position);
    let mut moves = vec![Move::placement(position)];
    for (line_no, line) in lines.iter().enumerate().skip(1) {
        let step = classify(line.as_ref(), line_no)
            .and_then(|instruction| cursor.apply(instruction, catalog))
            .map_err(|err| reject(line_no, err))?;
        moves.extend(step);
    }

    Ok(CompiledRoute { moves, cursor })
}

impl Cursor {
    pub fn placed(position: Coord) -> Self {
        Self {
            position,
            heading: None,
        }
    }

    /// Evaluate one instruction; returns the move to record, if any.
    pub fn apply(
        &mut self,
        instruction: Instruction,
        catalog: &LandmarkCatalog,
    ) -> Result<Option<Move>, CompileError> {
        match instruction {
            Instruction::Start(_) => Err(CompileError::malformed(
                "`start at` is only allowed as the first instruction",
            )),
            Instruction::GoToLandmark(name) => self.reach_landmark(&name, catalog),
            Instruction::MoveWithDirection { heading, blocks } => {
                self.heading = Some(heading);
                self.walk(heading, blocks).map(Some)
            }
            Instruction::MoveContinue { blocks } => {
                let heading = self.require_heading("go N blocks")?;
                self.walk(heading, blocks).map(Some)
            }
            Instruction::Turn(turn) => {
                let heading = self.require_heading("turn")?.turned(turn);
                self.heading = Some(heading);
                Ok(Some(Move {
                    start: self.position,
                    heading: Some(heading),
                    distance: 0,
                }))
            }
        }
    }

    fn require_heading(&self, instruction: &'static str) -> Result<Heading, CompileError> {
        self.heading
            .ok_or(CompileError::MissingDirectionContext { instruction })
    }

    fn walk(&mut self, heading: Heading, distance: u64) -> Result<Move, CompileError> {
        let end = advance(self.position, heading.vector(), distance).ok_or_else(|| {
            CompileError::malformed(format!("distance {distance} is out of range"))
        })?;
        if end.is_negative() {
            return Err(CompileError::NegativeCoordinate { position: end });
        }
        let step = Move {
            start: self.position,
            heading: Some(heading),
            distance,
        };
        self.position = end;
        Ok(step)
    }

    /// Travel along the current heading until the named landmark.
    ///
    /// The landmark must sit on the travel line (same coordinate on the
    /// orthogonal axis) and ahead of the agent, not behind it.
    fn reach_landmark(
        &mut self,
        name: &str,
        catalog: &LandmarkCatalog,
    ) -> Result<Option<Move>, CompileError> {
        let landmark = catalog
            .get(name)
            .ok_or_else(|| CompileError::UnknownLandmark {
                name: name.to_string(),
            })?;
        if landmark == self.position {
            return Ok(None);
        }
        let heading = self.require_heading("go until you reach landmark")?;

        let vector = heading.vector();
        let (along, across) = if vector.x != 0 {
            (
                landmark.x.saturating_sub(self.position.x),
                landmark.y.saturating_sub(self.position.y),
            )
        } else {
            (
                landmark.y.saturating_sub(self.position.y),
                landmark.x.saturating_sub(self.position.x),
            )
        };
        let sign = vector.x + vector.y;

        if across != 0 {
            return Err(CompileError::UnreachableLandmark {
                name: name.to_string(),
                landmark,
                position: self.position,
                heading,
            });
        }
        if along.signum() != sign {
            return Err(CompileError::WrongDirection {
                name: name.to_string(),
                landmark,
                position: self.position,
                heading,
            });
        }

        let step = Move {
            start: self.position,
            heading: Some(heading),
            distance: along.unsigned_abs(),
        };
        self.position = landmark;
        Ok(Some(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Turn;

    fn square_catalog() -> LandmarkCatalog {
        [("Square", Coord::new(0, 5)), ("Tower", Coord::new(9, 5))]
            .into_iter()
            .collect()
    }

    fn compile(lines: &[&str]) -> Result<CompiledRoute, Rejection> {
        compile_lines(lines, &square_catalog())
    }

    fn rejected_kind(lines: &[&str]) -> (usize, &'static str) {
        let rejection = compile(lines).expect_err("batch should be rejected");
        (rejection.line_no, rejection.error.kind())
    }

    #[test]
    fn start_alone_compiles_to_placement() {
        let compiled = compile(&["start at (3,4)"]).expect("compile");
        assert_eq!(compiled.moves, vec![Move::placement(Coord::new(3, 4))]);
        assert_eq!(compiled.cursor, Cursor::placed(Coord::new(3, 4)));
    }

    #[test]
    fn negative_start_is_rejected() {
        assert_eq!(rejected_kind(&["start at (-1,4)"]), (0, "NegativeCoordinate"));
    }

    #[test]
    fn directed_move_advances_cursor() {
        let compiled = compile(&["start at (5,5)", "go West 5 blocks"]).expect("compile");
        assert_eq!(compiled.moves.len(), 2);
        assert_eq!(compiled.cursor.position, Coord::new(0, 5));
        assert_eq!(
            compiled.moves[1],
            Move {
                start: Coord::new(5, 5),
                heading: Some(Heading::West),
                distance: 5,
            }
        );
    }

    #[test]
    fn continuing_past_the_edge_is_rejected_at_that_line() {
        let lines = ["start at (5,5)", "go West 5 blocks", "go 8 blocks"];
        assert_eq!(rejected_kind(&lines), (2, "NegativeCoordinate"));
        let rejection = compile(&lines).expect_err("reject");
        assert_eq!(rejection.line, "go 8 blocks");
        assert_eq!(
            rejection.error,
            CompileError::NegativeCoordinate {
                position: Coord::new(-8, 5)
            }
        );
    }

    #[test]
    fn landmark_at_current_position_is_a_no_op() {
        let compiled = compile(&[
            "start at (5,5)",
            "go West 5 blocks",
            "go until you reach landmark \"Square\"",
        ])
        .expect("compile");
        assert_eq!(compiled.moves.len(), 2);
        assert_eq!(compiled.cursor.position, Coord::new(0, 5));
    }

    #[test]
    fn landmark_ahead_emits_step_to_exact_coordinate() {
        let compiled = compile(&[
            "start at (2,5)",
            "go East 1 blocks",
            "go until you reach landmark \"Tower\"",
        ])
        .expect("compile");
        assert_eq!(
            compiled.moves.last(),
            Some(&Move {
                start: Coord::new(3, 5),
                heading: Some(Heading::East),
                distance: 6,
            })
        );
        assert_eq!(compiled.cursor.position, Coord::new(9, 5));
    }

    #[test]
    fn landmark_behind_is_wrong_direction() {
        let lines = [
            "start at (5,5)",
            "go East 1 blocks",
            "go until you reach landmark \"Square\"",
        ];
        assert_eq!(rejected_kind(&lines), (2, "WrongDirection"));
    }

    #[test]
    fn landmark_off_the_line_is_unreachable() {
        let lines = [
            "start at (5,5)",
            "go North 1 blocks",
            "go until you reach landmark \"Tower\"",
        ];
        assert_eq!(rejected_kind(&lines), (2, "UnreachableLandmark"));
    }

    #[test]
    fn landmark_reachability_holds_on_vertical_axis() {
        let catalog: LandmarkCatalog = [("Gate", Coord::new(4, 1))].into_iter().collect();
        let compiled = compile_lines(
            &[
                "start at (4, 9)",
                "go South 2 blocks",
                "go until you reach landmark \"Gate\"",
            ],
            &catalog,
        )
        .expect("compile");
        assert_eq!(
            compiled.moves.last(),
            Some(&Move {
                start: Coord::new(4, 7),
                heading: Some(Heading::South),
                distance: 6,
            })
        );

        let rejection = compile_lines(
            &[
                "start at (4, 9)",
                "go North 2 blocks",
                "go until you reach landmark \"Gate\"",
            ],
            &catalog,
        )
        .expect_err("reject");
        assert_eq!(rejection.error.kind(), "WrongDirection");
    }

    #[test]
    fn landmark_ahead_heading_west() {
        let compiled = compile(&[
            "start at (6,5)",
            "go West 2 blocks",
            "go until you reach landmark \"Square\"",
        ])
        .expect("compile");
        assert_eq!(
            compiled.moves.last(),
            Some(&Move {
                start: Coord::new(4, 5),
                heading: Some(Heading::West),
                distance: 4,
            })
        );
        assert_eq!(compiled.cursor.position, Coord::new(0, 5));
    }

    #[test]
    fn landmark_ahead_heading_north() {
        let compiled = compile(&[
            "start at (9,1)",
            "go North 1 blocks",
            "go until you reach landmark \"Tower\"",
        ])
        .expect("compile");
        assert_eq!(
            compiled.moves.last(),
            Some(&Move {
                start: Coord::new(9, 2),
                heading: Some(Heading::North),
                distance: 3,
            })
        );
        assert_eq!(compiled.cursor.position, Coord::new(9, 5));
    }

    #[test]
    fn landmark_behind_heading_west_is_wrong_direction() {
        let lines = [
            "start at (5,5)",
            "go West 1 blocks",
            "go until you reach landmark \"Tower\"",
        ];
        assert_eq!(rejected_kind(&lines), (2, "WrongDirection"));
    }

    #[test]
    fn landmark_off_the_column_heading_north_is_unreachable() {
        let lines = [
            "start at (9,1)",
            "go North 1 blocks",
            "go until you reach landmark \"Square\"",
        ];
        assert_eq!(rejected_kind(&lines), (2, "UnreachableLandmark"));
    }

    #[test]
    fn unknown_landmark_is_rejected() {
        let lines = ["start at (5,5)", "go until you reach landmark \"Harbor\""];
        assert_eq!(rejected_kind(&lines), (1, "UnknownLandmark"));
    }

    #[test]
    fn landmark_without_heading_needs_direction() {
        let lines = ["start at (5,5)", "go until you reach landmark \"Tower\""];
        assert_eq!(rejected_kind(&lines), (1, "MissingDirectionContext"));
    }

    #[test]
    fn plain_move_and_turn_need_heading() {
        assert_eq!(
            rejected_kind(&["start at (1,1)", "go 2 blocks"]),
            (1, "MissingDirectionContext")
        );
        assert_eq!(
            rejected_kind(&["start at (1,1)", "turn left"]),
            (1, "MissingDirectionContext")
        );
    }

    #[test]
    fn turn_emits_zero_distance_step_with_new_heading() {
        let compiled = compile(&["start at (1,1)", "go East 2 blocks", "turn left", "go 3 blocks"])
            .expect("compile");
        assert_eq!(
            compiled.moves[2],
            Move {
                start: Coord::new(3, 1),
                heading: Some(Heading::North),
                distance: 0,
            }
        );
        assert_eq!(compiled.cursor.position, Coord::new(3, 4));
        assert_eq!(compiled.cursor.heading, Some(Heading::North));
    }

    #[test]
    fn heading_round_trip_through_cursor() {
        let catalog = LandmarkCatalog::new();
        let mut cursor = Cursor {
            position: Coord::new(1, 1),
            heading: Some(Heading::East),
        };
        for turn in [Turn::Left, Turn::Left, Turn::Right, Turn::Right] {
            cursor
                .apply(Instruction::Turn(turn), &catalog)
                .expect("turn");
        }
        assert_eq!(cursor.heading, Some(Heading::East));
        assert_eq!(cursor.position, Coord::new(1, 1));
    }

    #[test]
    fn first_line_must_be_start() {
        assert_eq!(
            rejected_kind(&["go East 2 blocks"]),
            (0, "MalformedInstruction")
        );
        assert_eq!(
            rejected_kind(&["start at (1,1)", "start at (2,2)"]),
            (1, "MalformedInstruction")
        );
    }

    #[test]
    fn empty_batch_is_malformed() {
        let empty: [&str; 0] = [];
        let rejection = compile_lines(&empty, &square_catalog()).expect_err("reject");
        assert_eq!(rejection.line_no, 0);
        assert_eq!(rejection.error.kind(), "MalformedInstruction");
    }

    #[test]
    fn huge_distance_is_malformed() {
        assert_eq!(
            rejected_kind(&["start at (0,0)", "go East 18446744073709551615 blocks"]),
            (1, "MalformedInstruction")
        );
    }
}
