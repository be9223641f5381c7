use serde::Serialize;

use super::geometry::{RegionDescriptor, Side};
use crate::buffer::Dimensions;

/// Fraction of the frame height, measured from the top, whose hazards count as near.
const NEAR_FRACTION: f64 = 0.75;
/// Near hazards at or above this count force a slowdown.
const SLOW_NEAR_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    #[serde(rename = "")]
    Clear,
    Slow,
    Left,
    Right,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Clear => "",
            Command::Slow => "slow",
            Command::Left => "left",
            Command::Right => "right",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps one frame's hazard descriptors to a steering command.
pub fn decide(descriptors: &[RegionDescriptor], dims: Dimensions) -> Command {
    if descriptors.is_empty() {
        return Command::Clear;
    }

    let vertical_threshold = (dims.height as f64 * NEAR_FRACTION).floor() as i64;
    let near_count = descriptors
        .iter()
        .filter(|d| d.centroid.y as i64 <= vertical_threshold)
        .count();

    if near_count >= SLOW_NEAR_COUNT {
        return Command::Slow;
    }

    let (left_area, right_area) =
        descriptors
            .iter()
            .fold((0.0f64, 0.0f64), |(left, right), d| match d.side {
                Side::Left => (left + d.area, right),
                Side::Right => (left, right + d.area),
            });

    if left_area == 0.0 && right_area > 0.0 {
        Command::Left
    } else if right_area == 0.0 && left_area > 0.0 {
        Command::Right
    } else if left_area > right_area {
        // steer away from the side carrying more hazard area
        Command::Left
    } else {
        Command::Right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::geometry::Point;

    const DIMS: Dimensions = Dimensions {
        width: 640,
        height: 480,
    };

    // y = 400 lies below the 360px near threshold for a 480px frame
    fn far(area: f64, side: Side) -> RegionDescriptor {
        let x = match side {
            Side::Left => 100,
            Side::Right => 500,
        };
        RegionDescriptor {
            area,
            centroid: Point::new(x, 400),
            side,
        }
    }

    fn near(area: f64, side: Side) -> RegionDescriptor {
        RegionDescriptor {
            centroid: Point::new(far(area, side).centroid.x, 100),
            ..far(area, side)
        }
    }

    #[test]
    fn test_no_detections_is_clear() {
        assert_eq!(decide(&[], DIMS), Command::Clear);
        assert_eq!(Command::Clear.as_str(), "");
    }

    #[test]
    fn test_three_near_hazards_slow_down() {
        let descriptors = [
            near(10.0, Side::Left),
            near(5000.0, Side::Right),
            near(1.0, Side::Right),
        ];
        assert_eq!(decide(&descriptors, DIMS), Command::Slow);

        let with_far = [
            near(0.0, Side::Left),
            near(0.0, Side::Left),
            near(0.0, Side::Left),
            far(9000.0, Side::Right),
        ];
        assert_eq!(decide(&with_far, DIMS), Command::Slow);
    }

    #[test]
    fn test_near_threshold_is_inclusive() {
        // floor(480 * 0.75) = 360
        let at_threshold = RegionDescriptor {
            area: 1.0,
            centroid: Point::new(10, 360),
            side: Side::Left,
        };
        let below = RegionDescriptor {
            centroid: Point::new(10, 361),
            ..at_threshold
        };

        assert_eq!(decide(&[at_threshold; 3], DIMS), Command::Slow);
        assert_eq!(decide(&[below; 3], DIMS), Command::Right);

        // floor(481 * 0.75) = 360
        let odd = Dimensions {
            width: 640,
            height: 481,
        };
        assert_eq!(decide(&[below; 3], odd), Command::Right);
    }

    #[test]
    fn test_one_sided_hazard_steers_to_clear_side() {
        assert_eq!(decide(&[far(500.0, Side::Left)], DIMS), Command::Right);
        assert_eq!(decide(&[far(500.0, Side::Right)], DIMS), Command::Left);
        assert_eq!(
            decide(&[near(500.0, Side::Right), near(20.0, Side::Right)], DIMS),
            Command::Left
        );
    }

    #[test]
    fn test_steers_away_from_greater_area() {
        let less_left = [far(300.0, Side::Left), far(700.0, Side::Right)];
        assert_eq!(decide(&less_left, DIMS), Command::Left);

        let more_left = [far(700.0, Side::Left), far(300.0, Side::Right)];
        assert_eq!(decide(&more_left, DIMS), Command::Right);
    }

    #[test]
    fn test_ties_default_right() {
        let tie = [far(500.0, Side::Left), far(500.0, Side::Right)];
        assert_eq!(decide(&tie, DIMS), Command::Right);

        let zero_area = [far(0.0, Side::Left), far(0.0, Side::Right)];
        assert_eq!(decide(&zero_area, DIMS), Command::Right);
    }

    #[test]
    fn test_decision_is_deterministic() {
        let descriptors = [
            far(120.0, Side::Left),
            near(80.0, Side::Right),
            far(40.0, Side::Right),
        ];
        let first = decide(&descriptors, DIMS);
        for _ in 0..10 {
            assert_eq!(decide(&descriptors, DIMS), first);
        }
    }

    #[test]
    fn test_command_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Command::Clear).unwrap(), "\"\"");
        assert_eq!(serde_json::to_string(&Command::Slow).unwrap(), "\"slow\"");
        assert_eq!(serde_json::to_string(&Command::Left).unwrap(), "\"left\"");
        assert_eq!(serde_json::to_string(&Command::Right).unwrap(), "\"right\"");
    }
}
