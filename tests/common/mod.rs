#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::delay::DelayNs;
use max77843_charger::{
    CableType, ChargeMode, Charger, ChargerConfig, Health, PowerSupplyHost, Reg, RegisterAccess, Timebase,
    WakeSource,
};

pub type Bus = Mutex<NoopRawMutex, FakeRegisters>;
pub type TestCharger<'a> = Charger<'a, NoopRawMutex, FakeRegisters, MockTime, FakeHost>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BusFault;

/// In-memory register file.
///
/// Reads of a register with a script pop the script first and fall back to the stored
/// value once it runs dry.
pub struct FakeRegisters {
    pub regs: [u8; 256],
    pub writes: Vec<(u8, u8)>,
    scripts: HashMap<u8, VecDeque<u8>>,
    failing: HashSet<u8>,
    stuck: HashSet<u8>,
}

impl FakeRegisters {
    pub fn new() -> Self {
        let mut regs = [0u8; 256];
        regs[Reg::PMIC_REVISION.0 as usize] = 0x02;
        regs[Reg::CHG_INT_MASK.0 as usize] = 0xff;
        regs[Reg::CHG_CNFG_06.0 as usize] = 0x0c;
        FakeRegisters {
            regs,
            writes: Vec::new(),
            scripts: HashMap::new(),
            failing: HashSet::new(),
            stuck: HashSet::new(),
        }
    }

    pub fn get(&self, reg: Reg) -> u8 {
        self.regs[reg.0 as usize]
    }

    pub fn set(&mut self, reg: Reg, value: u8) {
        self.regs[reg.0 as usize] = value;
    }

    pub fn script(&mut self, reg: Reg, values: &[u8]) {
        self.scripts.entry(reg.0).or_default().extend(values);
    }

    pub fn fail(&mut self, reg: Reg) {
        self.failing.insert(reg.0);
    }

    /// Writes to `reg` are accepted but do not change it.
    pub fn stick(&mut self, reg: Reg) {
        self.stuck.insert(reg.0);
    }

    pub fn writes_to(&self, reg: Reg) -> usize {
        self.writes.iter().filter(|(r, _)| *r == reg.0).count()
    }
}

impl RegisterAccess for FakeRegisters {
    type Error = BusFault;

    async fn read(&mut self, reg: Reg) -> Result<u8, BusFault> {
        if self.failing.contains(&reg.0) {
            return Err(BusFault);
        }
        if let Some(value) = self.scripts.get_mut(&reg.0).and_then(VecDeque::pop_front) {
            return Ok(value);
        }
        Ok(self.regs[reg.0 as usize])
    }

    async fn write(&mut self, reg: Reg, value: u8) -> Result<(), BusFault> {
        if self.failing.contains(&reg.0) {
            return Err(BusFault);
        }
        self.writes.push((reg.0, value));
        if !self.stuck.contains(&reg.0) {
            self.regs[reg.0 as usize] = value;
        }
        Ok(())
    }
}

/// Simulated clock. Delays advance it instantly.
#[derive(Clone, Default)]
pub struct MockTime {
    now_us: Rc<Cell<u64>>,
}

impl MockTime {
    pub fn advance(&self, ms: u64) {
        self.now_us.set(self.now_us.get() + ms * 1000);
    }
}

impl DelayNs for MockTime {
    async fn delay_ns(&mut self, ns: u32) {
        self.now_us.set(self.now_us.get() + u64::from(ns).div_ceil(1000));
    }

    async fn delay_us(&mut self, us: u32) {
        self.now_us.set(self.now_us.get() + u64::from(us));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.now_us.set(self.now_us.get() + u64::from(ms) * 1000);
    }
}

impl Timebase for MockTime {
    fn now_ms(&self) -> u64 {
        self.now_us.get() / 1000
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Report {
    Health(Health),
    Full,
    SlowCharging,
    BatteryRemoved,
    WirelessOnline(bool),
    OtgOvercurrent,
    AfcVoltage(u8),
    WirelessOtg(bool),
}

/// Battery framework stand-in. Health follows what the charger reports.
#[derive(Debug)]
pub struct FakeHost {
    pub health: Health,
    pub online: CableType,
    pub capacity: u8,
    pub average_current: i32,
    pub swelling: bool,
    pub charge_mode: ChargeMode,
    pub slate: bool,
    pub power_sharing: bool,
    pub reports: Vec<Report>,
    pub acquired: Vec<WakeSource>,
    pub released: Vec<WakeSource>,
}

impl FakeHost {
    pub fn new() -> Self {
        FakeHost {
            health: Health::Good,
            online: CableType::Battery,
            capacity: 50,
            average_current: 0,
            swelling: false,
            charge_mode: ChargeMode::None,
            slate: false,
            power_sharing: false,
            reports: Vec::new(),
            acquired: Vec::new(),
            released: Vec::new(),
        }
    }

    pub fn reported(&self, report: Report) -> bool {
        self.reports.contains(&report)
    }

    /// Every acquired wake hold has been released exactly once.
    pub fn wake_balanced(&self) -> bool {
        let mut acquired = self.acquired.clone();
        let mut released = self.released.clone();
        acquired.sort_by_key(|s| *s as u8);
        released.sort_by_key(|s| *s as u8);
        acquired == released
    }
}

impl PowerSupplyHost for FakeHost {
    fn battery_health(&self) -> Health {
        self.health
    }

    fn battery_online(&self) -> CableType {
        self.online
    }

    fn battery_capacity(&self) -> u8 {
        self.capacity
    }

    fn average_current_ma(&self) -> i32 {
        self.average_current
    }

    fn swelling_active(&self) -> bool {
        self.swelling
    }

    fn charge_mode(&self) -> ChargeMode {
        self.charge_mode
    }

    fn slate_mode(&self) -> bool {
        self.slate
    }

    fn power_sharing_active(&self) -> bool {
        self.power_sharing
    }

    fn report_health(&mut self, health: Health) {
        self.health = health;
        self.reports.push(Report::Health(health));
    }

    fn report_full(&mut self) {
        self.reports.push(Report::Full);
    }

    fn report_slow_charging(&mut self) {
        self.reports.push(Report::SlowCharging);
    }

    fn report_battery_removed(&mut self) {
        self.reports.push(Report::BatteryRemoved);
    }

    fn set_wireless_online(&mut self, online: bool) {
        self.reports.push(Report::WirelessOnline(online));
    }

    fn report_otg_overcurrent(&mut self) {
        self.reports.push(Report::OtgOvercurrent);
    }

    fn request_afc_voltage(&mut self, volts: u8) {
        self.reports.push(Report::AfcVoltage(volts));
    }

    fn wireless_otg_control(&mut self, enable: bool) {
        self.reports.push(Report::WirelessOtg(enable));
    }

    fn wake_acquire(&mut self, source: WakeSource) {
        self.acquired.push(source);
    }

    fn wake_release(&mut self, source: WakeSource) {
        self.released.push(source);
    }
}

pub fn bus() -> Bus {
    Mutex::new(FakeRegisters::new())
}

pub fn charger<'a>(bus: &'a Bus, time: &MockTime) -> TestCharger<'a> {
    charger_with(bus, time, ChargerConfig::default())
}

pub fn charger_with<'a>(bus: &'a Bus, time: &MockTime, config: ChargerConfig) -> TestCharger<'a> {
    Charger::new(bus, time.clone(), FakeHost::new(), config)
}

/// Run a closure against the register file.
pub fn regs<O>(bus: &Bus, f: impl FnOnce(&mut FakeRegisters) -> O) -> O {
    let mut guard = bus.try_lock().expect("bus is free between operations");
    f(&mut guard)
}
