/*!
Hôte scripté

Fournit des lectures CPU/RAM/disque contrôlées par le test. Le CPU avance
d'un pourcentage fixe entre deux lectures, donc le delta calculé par le
`Sampler` vaut exactement ce pourcentage.
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use symbion_sentinel::sampler::{CpuTicks, DiskReading, HostProbe, MemoryReading, SampleError};

/// Ticks ajoutés à chaque lecture
const TICKS_PER_READ: u64 = 1000;

struct HostState {
    ticks: CpuTicks,
    cpu_pct: f64,
    memory: MemoryReading,
    disk: Option<DiskReading>,
    cpu_broken: bool,
    cpu_reads: usize,
}

pub struct ScriptedHost {
    state: Mutex<HostState>,
}

impl ScriptedHost {
    /// Hôte calme: CPU 10%, RAM 50%, disque 40%
    pub fn new() -> Self {
        let host = Self {
            state: Mutex::new(HostState {
                ticks: CpuTicks {
                    idle_ticks: 0,
                    total_ticks: 0,
                },
                cpu_pct: 10.0,
                memory: MemoryReading {
                    total_mb: 1000,
                    free_mb: 500,
                },
                disk: None,
                cpu_broken: false,
                cpu_reads: 0,
            }),
        };
        host.set_disk_percent(Some(40));
        host
    }

    pub fn set_cpu_percent(&self, pct: f64) {
        self.state.lock().cpu_pct = pct.clamp(0.0, 100.0);
    }

    /// RAM sur 1000 MB, `pct` utilisés
    pub fn set_ram_percent(&self, pct: u8) {
        let used = u64::from(pct.min(100)) * 10;
        self.state.lock().memory = MemoryReading {
            total_mb: 1000,
            free_mb: 1000 - used,
        };
    }

    /// `None` simule un `df` en échec
    pub fn set_disk_percent(&self, pct: Option<u8>) {
        self.state.lock().disk = pct.map(|p| {
            let used = f64::from(p.min(100));
            DiskReading {
                total_gb: 100.0,
                used_gb: used,
                free_gb: 100.0 - used,
                percent: p.min(100),
            }
        });
    }

    /// Les lectures CPU échouent tant que `broken` est vrai
    pub fn set_cpu_broken(&self, broken: bool) {
        self.state.lock().cpu_broken = broken;
    }

    /// Nombre de lectures CPU réussies
    pub fn cpu_reads(&self) -> usize {
        self.state.lock().cpu_reads
    }
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostProbe for ScriptedHost {
    async fn cpu_ticks(&self) -> Result<CpuTicks, SampleError> {
        let mut state = self.state.lock();
        if state.cpu_broken {
            return Err(SampleError::Parse("mock /proc/stat unavailable".into()));
        }

        let busy = (state.cpu_pct * TICKS_PER_READ as f64 / 100.0).round() as u64;
        state.ticks = CpuTicks {
            idle_ticks: state.ticks.idle_ticks + (TICKS_PER_READ - busy),
            total_ticks: state.ticks.total_ticks + TICKS_PER_READ,
        };
        state.cpu_reads += 1;
        Ok(state.ticks)
    }

    async fn memory(&self) -> Result<MemoryReading, SampleError> {
        Ok(self.state.lock().memory)
    }

    async fn disk(&self) -> Option<DiskReading> {
        self.state.lock().disk
    }
}
