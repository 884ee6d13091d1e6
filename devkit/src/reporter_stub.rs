/*!
Reporter de test

Enregistre chaque date demandée; peut échouer systématiquement pour vérifier
que les autres boucles n'en souffrent pas.
*/

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use symbion_sentinel::notify::NotifyError;
use symbion_sentinel::report::{ReportError, Reporter};

#[derive(Default)]
pub struct RecordingReporter {
    dates: Mutex<Vec<NaiveDate>>,
    failing: bool,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre l'appel puis renvoie une erreur
    pub fn failing() -> Self {
        Self {
            dates: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Dates demandées, dans l'ordre des appels
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.dates.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.dates.lock().len()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn report(&self, date: NaiveDate) -> Result<(), ReportError> {
        self.dates.lock().push(date);
        log::info!("📊 [MOCK] Report requested for {}", date);
        if self.failing {
            return Err(ReportError::Notify(NotifyError::Delivery("mock reporter offline".into())));
        }
        Ok(())
    }
}
