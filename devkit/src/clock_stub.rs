/*!
Horloge liée au temps tokio

Avance avec `tokio::time` (donc avec l'horloge en pause des tests) à partir
d'une date locale fixe. `step` simule un saut de l'horloge murale.
*/

use chrono::{DateTime, Local, TimeDelta};
use parking_lot::Mutex;
use symbion_sentinel::scheduler::Clock;
use tokio::time::Instant;

pub struct PausedClock {
    origin: DateTime<Local>,
    started: Instant,
    offset: Mutex<TimeDelta>,
}

impl PausedClock {
    pub fn starting_at(origin: DateTime<Local>) -> Self {
        Self {
            origin,
            started: Instant::now(),
            offset: Mutex::new(TimeDelta::zero()),
        }
    }

    /// Décale l'horloge murale (négatif = retour en arrière)
    pub fn step(&self, delta: TimeDelta) {
        *self.offset.lock() += delta;
        log::info!("⏱️ [MOCK] Wall clock stepped by {}", delta);
    }
}

impl Clock for PausedClock {
    fn now(&self) -> DateTime<Local> {
        let elapsed = TimeDelta::from_std(self.started.elapsed()).unwrap_or(TimeDelta::zero());
        self.origin + elapsed + *self.offset.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn follows_tokio_time_and_steps() {
        let origin = Local.with_ymd_and_hms(2026, 3, 14, 8, 30, 0).single().unwrap();
        let clock = PausedClock::starting_at(origin);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(clock.now(), origin + TimeDelta::minutes(1));

        clock.step(TimeDelta::minutes(-10));
        assert_eq!(clock.now(), origin - TimeDelta::minutes(9));
    }
}
