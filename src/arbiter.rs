/// Resource arbiter: the core pool and the SSD slot.
/// Holds the only shared counters of the simulation; the driver owns one and
/// passes it around explicitly.
#[derive(Debug, Clone)]
pub struct ResourceArbiter {
    total_cores: usize,
    free_cores: usize,
    ssd_busy: bool,
}

impl ResourceArbiter {
    pub fn new(total_cores: usize) -> Self {
        ResourceArbiter {
            total_cores,
            free_cores: total_cores,
            ssd_busy: false,
        }
    }

    pub fn total_cores(&self) -> usize {
        self.total_cores
    }

    pub fn free_cores(&self) -> usize {
        self.free_cores
    }

    pub fn has_free_core(&self) -> bool {
        self.free_cores > 0
    }

    pub fn ssd_busy(&self) -> bool {
        self.ssd_busy
    }

    pub fn acquire_core(&mut self) {
        assert!(self.free_cores > 0, "core acquired with none free");
        self.free_cores -= 1;
    }

    pub fn release_core(&mut self) {
        assert!(
            self.free_cores < self.total_cores,
            "core released with all {} free",
            self.total_cores
        );
        self.free_cores += 1;
    }

    pub fn acquire_ssd(&mut self) {
        assert!(!self.ssd_busy, "SSD acquired while busy");
        self.ssd_busy = true;
    }

    pub fn release_ssd(&mut self) {
        assert!(self.ssd_busy, "SSD released while idle");
        self.ssd_busy = false;
    }
}
