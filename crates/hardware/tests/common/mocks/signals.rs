use mockall::mock;
use wishbone_bfm::signals::{SignalAccess, SignalId};

mock! {
    pub Bus {}
    impl SignalAccess for Bus {
        fn lookup(&self, name: &str) -> Option<SignalId>;
        fn read(&self, id: SignalId) -> u64;
        fn write(&mut self, id: SignalId, value: u64);
        fn width(&self, id: SignalId) -> u32;
    }
}
