use engine::Vec2;

pub(crate) const ARRIVAL_THRESHOLD: f32 = 1.0;

/// Moves `position` up to `speed` units toward `destination`, snapping when
/// the remaining distance is within one step. Returns the distance measured
/// before the move.
pub(crate) fn move_towards(position: &mut Vec2, destination: Vec2, speed: f32) -> f32 {
    let offset = destination - *position;
    let distance = offset.length();
    if distance <= speed {
        *position = destination;
        return distance;
    }
    *position += offset * (speed / distance);
    distance
}
