//! Interrupt events and the deferred-work loop.
//!
//! Interrupt handlers only push an [`Event`] through an [`IrqHandle`]. Everything that
//! touches registers or sleeps runs from [`Charger::run`] (or [`Charger::poll`] in tests),
//! one item at a time.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use log::{debug, info, warn};

use crate::cable::CableType;
use crate::charger::{report, Charger};
use crate::host::{PowerSupplyHost, WakeSource};
use crate::interface::RegisterAccess;
use crate::registers::{bits, ChargeDetail, Details01, Details02, Interrupts, Reg};
use crate::schedule::Work;
use crate::state::ChargingStatus;
use crate::time::Timebase;

/// Delay before handling a pad change while the pad was online.
#[cfg(not(feature = "factory"))]
const WPC_ONLINE_DELAY_MS: u32 = 500;
#[cfg(feature = "factory")]
const WPC_ONLINE_DELAY_MS: u32 = 0;

/// Hardware interrupt sources.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Event {
    /// Charger status changed.
    Charger,
    /// A cable was plugged or unplugged.
    CablePresence,
    /// Wired input status changed.
    ChgIn,
    /// Bypass node fault.
    Bypass,
    /// Wireless pad presence changed.
    WirelessPad,
    /// Input current loop tripped.
    Aicl,
    /// Battery presence changed.
    BatteryPresence,
}

/// Queue between the interrupt handlers and the controller.
pub type EventQueue<M, const N: usize> = Channel<M, Event, N>;

/// Interrupt lines that registered successfully.
///
/// Events from a line that is not set here are dropped for the whole session.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct InterruptLines {
    /// Charger interrupt.
    pub charger: bool,
    /// Wired input interrupt. Also carries cable presence changes.
    pub chgin: bool,
    /// Bypass interrupt.
    pub bypass: bool,
    /// Battery presence interrupt.
    pub battery_presence: bool,
    /// Wireless pad interrupt.
    pub wireless_pad: bool,
    /// AICL interrupt.
    pub aicl: bool,
}

impl InterruptLines {
    /// No line registered.
    pub const fn none() -> Self {
        InterruptLines {
            charger: false,
            chgin: false,
            bypass: false,
            battery_presence: false,
            wireless_pad: false,
            aicl: false,
        }
    }

    /// Every line registered.
    pub const fn all() -> Self {
        InterruptLines {
            charger: true,
            chgin: true,
            bypass: true,
            battery_presence: true,
            wireless_pad: true,
            aicl: true,
        }
    }

    /// Whether the line raising `event` is registered.
    pub fn carries(&self, event: Event) -> bool {
        match event {
            Event::Charger => self.charger,
            Event::ChgIn | Event::CablePresence => self.chgin,
            Event::Bypass => self.bypass,
            Event::WirelessPad => self.wireless_pad,
            Event::Aicl => self.aicl,
            Event::BatteryPresence => self.battery_presence,
        }
    }
}

/// AICL interrupt state. Disabled while a high voltage adapter is attached.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum AiclIrq {
    /// The line never registered.
    Unavailable,
    /// Registered but masked.
    Disabled,
    /// Registered and unmasked.
    Enabled,
}

/// Interrupt-side handle: queues events without blocking.
pub struct IrqHandle<'ch, M: RawMutex, const N: usize> {
    sender: Sender<'ch, M, Event, N>,
}

impl<'ch, M: RawMutex, const N: usize> IrqHandle<'ch, M, N> {
    /// Handle feeding `queue`.
    pub fn new(queue: &'ch EventQueue<M, N>) -> Self {
        IrqHandle { sender: queue.sender() }
    }

    /// Queue `event`. Returns `false` and drops the event when the queue is full.
    pub fn raise(&self, event: Event) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("event queue full, dropped {:?}", event);
                false
            }
        }
    }
}

impl<'a, M, R, T, H> Charger<'a, M, R, T, H>
where
    M: RawMutex,
    R: RegisterAccess,
    T: Timebase,
    H: PowerSupplyHost,
{
    /// Turn an interrupt event into deferred work.
    pub async fn handle_event(&mut self, event: Event) {
        if !self.lines.carries(event) {
            debug!("{:?} from unregistered line ignored", event);
            return;
        }
        debug!("event {:?}", event);

        match event {
            Event::Charger => {
                if self.config.full_check_on_interrupt || self.config.ovp_uvlo_on_interrupt {
                    self.schedule_in(Work::ChargerIrq, 0);
                }
            }
            Event::ChgIn => {
                if self.chgin_irq_enabled {
                    self.schedule_in_if_idle(Work::ChgInDebounce, 0);
                }
            }
            Event::CablePresence => self.handle_cable_presence().await,
            Event::Bypass => self.handle_bypass().await,
            Event::WirelessPad => {
                let wcin = Interrupts::new().with_wcin(true).bits();
                let result = self.update(Reg::CHG_INT_MASK, wcin, wcin).await;
                report("WCIN interrupt mask", result);
                self.wake.hold(&mut self.host, WakeSource::WirelessPad);
                let delay = if self.state.wireless_online { WPC_ONLINE_DELAY_MS } else { 0 };
                self.schedule_in_if_idle(Work::WirelessPadDetect, delay);
            }
            Event::Aicl => {
                if self.aicl_irq == AiclIrq::Enabled {
                    self.schedule_in_if_idle(Work::Aicl, self.config.aicl_irq_delay_ms);
                }
            }
            Event::BatteryPresence => self.handle_battery_presence().await,
        }
    }

    /// Run every work item whose deadline has passed, earliest first.
    pub async fn run_due_work(&mut self) {
        while let Some(work) = self.work.take_due(self.time.now_ms()) {
            self.run_work(work).await;
        }
    }

    /// Handle every queued event, then run due work.
    pub async fn poll<EM: RawMutex, const N: usize>(&mut self, events: &Receiver<'_, EM, Event, N>) {
        while let Ok(event) = events.try_receive() {
            self.handle_event(event).await;
        }
        self.run_due_work().await;
    }

    /// Process events and deferred work forever.
    pub async fn run<EM: RawMutex, const N: usize>(&mut self, events: Receiver<'_, EM, Event, N>) -> ! {
        loop {
            self.run_due_work().await;

            let event = match self.work.next_deadline() {
                Some(at) => {
                    let wait = at.saturating_sub(self.time.now_ms());
                    let wait = u32::try_from(wait).unwrap_or(u32::MAX);
                    let next = select(events.receive(), self.time.delay_ms(wait)).await;
                    match next {
                        Either::First(event) => Some(event),
                        Either::Second(()) => None,
                    }
                }
                None => Some(events.receive().await),
            };

            if let Some(event) = event {
                self.handle_event(event).await;
            }
        }
    }

    async fn run_work(&mut self, work: Work) {
        debug!("running {:?}", work);
        match work {
            Work::Aicl => self.run_aicl().await,
            Work::WirelessRamp => self.wireless_ramp_tick().await,
            Work::AfcDetect => self.afc_detect_expired().await,
            Work::WirelessPadDetect => self.wireless_pad_detect().await,
            Work::ChgInDebounce => self.chgin_debounce().await,
            Work::ChargerIrq => self.charger_irq().await,
            Work::EnableChgInIrq => {
                let chgin = Interrupts::new().with_chgin(true).bits();
                let result = self.update(Reg::CHG_INT_MASK, 0, chgin).await;
                report("CHGIN interrupt unmask", result);
                self.chgin_irq_enabled = true;
                info!("CHGIN interrupt enabled");
            }
            Work::Watchdog => {
                self.kick_watchdog().await;
                self.schedule_in(Work::Watchdog, self.config.watchdog_interval_ms);
            }
        }
    }

    async fn charger_irq(&mut self) {
        if self.config.full_check_on_interrupt {
            match self.charging_status().await {
                ChargingStatus::Full => {
                    info!("charger interrupt: full");
                    self.host.report_full();
                }
                status => debug!("charger interrupt, status {:?}", status),
            }
        }

        if self.config.ovp_uvlo_on_interrupt {
            let health = self.charging_health().await;
            if health.is_input_fault() {
                info!("charger interrupt: {:?}", health);
            } else {
                debug!("charger interrupt, health {:?}", health);
            }
        }
    }

    /// Re-classify the attached source from the live input status and regulate for it.
    ///
    /// The host's finer classification is kept while it still matches the powered path.
    async fn handle_cable_presence(&mut self) {
        let source = self.online_source().await;
        let current = self.state.cable_type;
        let cable = if current != CableType::Unknown
            && source.is_unpowered() == current.is_unpowered()
            && source.is_wireless() == current.is_wireless()
        {
            current
        } else {
            source
        };
        info!("cable presence changed: {:?} (was {:?})", cable, current);
        let result = self.set_online(cable).await;
        report("cable change", result);
    }

    async fn handle_bypass(&mut self) {
        self.ensure_unlocked().await;
        let details = Details02::from_bits(self.read_or(Reg::CHG_DETAILS_02, 0).await);
        debug!("bypass detail {:?}", details.bypass());

        if details.bypass().otg_current_limit() {
            warn!("OTG overcurrent, output disabled");
            let result = self.update(Reg::CHG_CNFG_00, 0, bits::OTG_CTRL).await;
            report("OTG disable", result);
            self.host.report_otg_overcurrent();
        }
    }

    async fn handle_battery_presence(&mut self) {
        let batp = Interrupts::new().with_batp(true).bits();
        let result = self.update(Reg::CHG_INT_MASK, batp, batp).await;
        report("BATP interrupt mask", result);

        self.ensure_unlocked().await;
        let ok = Interrupts::from_bits(self.read_or(Reg::CHG_INT_OK, 0).await);
        if !ok.batp() {
            warn!("battery removed");
            self.host.report_battery_removed();
        }

        let result = self.update(Reg::CHG_INT_MASK, 0, batp).await;
        report("BATP interrupt unmask", result);
    }

    async fn wireless_pad_present(&mut self) -> bool {
        let retries = self.config.wpc_detect_retries;
        for attempt in 0..=retries {
            let ok = Interrupts::from_bits(self.read_or(Reg::CHG_INT_OK, 0).await);
            if ok.wcin() {
                return true;
            }
            if attempt < retries {
                self.time.delay_ms(self.config.wpc_detect_delay_ms).await;
            }
        }
        false
    }

    /// Charge detail after briefly enabling the charger, re-read while it reads off.
    async fn wireless_charge_detail(&mut self) -> ChargeDetail {
        let charging = self.state.is_charging;
        if !charging {
            let result = self.set_charger_state(true).await;
            report("charger on", result);
        }

        let mut detail = ChargeDetail::Off;
        for _ in 0..=self.config.wpc_detect_retries {
            detail = Details01::from_bits(self.read_or(Reg::CHG_DETAILS_01, 0).await).charger();
            self.time.delay_ms(self.config.wpc_detect_delay_ms).await;
            if detail != ChargeDetail::Off {
                break;
            }
        }

        if !charging {
            let result = self.set_charger_state(false).await;
            report("charger off", result);
        }
        detail
    }

    async fn wireless_pad_detect(&mut self) {
        let wcin = Interrupts::new().with_wcin(true).bits();
        let result = self.update(Reg::CHG_INT_MASK, 0, wcin).await;
        report("WCIN interrupt unmask", result);
        self.ensure_unlocked().await;

        let was_online = self.state.wireless_online;
        let online = self.wireless_pad_present().await;

        if !was_online && online {
            info!("wireless pad attached");
            self.host.set_wireless_online(true);
        } else if was_online && !online {
            let detail = self.wireless_charge_detail().await;
            if detail != ChargeDetail::Off && self.state.cable_type.is_wireless() {
                info!("wireless input low but still charging ({:?}), re-checking", detail);
                self.schedule_in(Work::WirelessPadDetect, self.config.wpc_recheck_delay_ms);
                return;
            }
            info!("wireless pad removed");
            self.host.set_wireless_online(false);
        }

        self.state.wireless_online = online;
        let result = self.update(Reg::CHG_INT_MASK, 0, wcin).await;
        report("WCIN interrupt unmask", result);
        self.wake.release(&mut self.host, WakeSource::WirelessPad);
    }
}
