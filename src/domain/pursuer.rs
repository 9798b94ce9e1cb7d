/// Pursuer controller: re-aims the projectile at the player every tick.
///
/// Velocity = (cos θ · speed + offset, sin θ · speed + offset), where θ is
/// the angle from the pursuer's center to the player's center. The offset
/// keeps the pursuer from ever matching the player's speed exactly.
/// Until the countdown launches it, the pursuer holds its spawn position.

use super::entity::Pursuer;

pub fn steer(pursuer: &mut Pursuer, target: (f32, f32), speed: f32, offset: f32) {
    if pursuer.paused || !pursuer.launched || !pursuer.body.enabled {
        pursuer.body.stop();
        return;
    }

    let (px, py) = pursuer.body.center();
    let angle = (target.1 - py).atan2(target.0 - px);

    pursuer.body.vx = angle.cos() * speed + offset;
    pursuer.body.vy = angle.sin() * speed + offset;
    pursuer.angle = angle;
}
