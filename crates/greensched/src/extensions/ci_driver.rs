//! External driver for `randwalk` carbon-intensity profiles.
//!
//! The core evaluates a `randwalk` profile as the node's last-known
//! intensity; something outside the engine has to move that value. This
//! driver performs a bounded random walk: every `stepSec` of simulated time
//! the intensity takes a uniform step of up to a tenth of the configured
//! span and is clamped back into `[min, max]`.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::core::ci_profile::CiProfile;
use crate::core::node::Node;

pub struct RandomWalkDriver {
    rand: Pcg64,
    last_tick: f64,
}

impl RandomWalkDriver {
    pub fn new(seed: u64) -> Self {
        Self {
            rand: Pcg64::seed_from_u64(seed),
            last_tick: 0.,
        }
    }

    /// Advances the node's live intensity to `now`, applying one step per
    /// elapsed `stepSec` interval. Nodes with other profiles are untouched.
    pub fn advance(&mut self, node: &mut Node, now: f64) {
        let (min, max, step_secs) = match node.ci_profile() {
            CiProfile::RandomWalk { min, max, step_secs } => (*min, *max, *step_secs),
            _ => return,
        };
        if step_secs <= 0. || now <= self.last_tick {
            return;
        }
        let steps = ((now - self.last_tick) / step_secs).floor() as u64;
        if steps == 0 {
            return;
        }
        let span = (max - min).max(0.);
        let mut value = node.carbon_intensity();
        for _ in 0..steps {
            value = (value + self.rand.gen_range(-span / 10. ..=span / 10.)).clamp(min, max);
        }
        node.set_carbon_intensity(value);
        self.last_tick += steps as f64 * step_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_stays_within_bounds() {
        let mut node = Node::new("w", 8., 16., "randwalk:80:300:600");
        let mut driver = RandomWalkDriver::new(3);
        for tick in 1..200 {
            driver.advance(&mut node, tick as f64 * 600.);
            let ci = node.carbon_intensity();
            assert!((80. ..=300.).contains(&ci));
        }
    }

    #[test]
    fn non_randwalk_profiles_are_untouched() {
        let mut node = Node::new("s", 8., 16., "static:120");
        let before = node.carbon_intensity();
        let mut driver = RandomWalkDriver::new(3);
        driver.advance(&mut node, 10_000.);
        assert_eq!(node.carbon_intensity(), before);
    }

    #[test]
    fn same_seed_walks_identically() {
        let mut a = Node::new("w", 8., 16., "randwalk:80:300:600");
        let mut b = Node::new("w", 8., 16., "randwalk:80:300:600");
        let mut da = RandomWalkDriver::new(11);
        let mut db = RandomWalkDriver::new(11);
        da.advance(&mut a, 6000.);
        db.advance(&mut b, 6000.);
        assert_eq!(a.carbon_intensity(), b.carbon_intensity());
    }
}
