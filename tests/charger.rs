mod common;

use common::{bus, charger, charger_with, regs, BusFault, MockTime, Report};
use max77843_charger::{
    bits, chgin_ilim_to_code, fast_charge_to_code, field, wcin_ilim_to_code, CableType, ChargeMode,
    ChargeType, ChargerConfig, ChargingStatus, Error, Event, InterruptLines, Reg, Timebase,
    WakeSource, Work,
};

#[tokio::test]
async fn init_programs_baseline_and_unmasks_lines() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);

    charger.init(InterruptLines::all()).await.unwrap();

    assert_eq!(charger.revision(), 2);
    regs(&bus, |r| {
        assert_eq!(r.get(Reg::CHG_CNFG_01), bits::CNFG_01_DEFAULT);
        assert_eq!(r.get(Reg::CHG_CNFG_03), bits::CNFG_03_DEFAULT);
        assert_eq!(field::CHG_CV_PRM.extract(r.get(Reg::CHG_CNFG_04)), 0x1d);
        assert_ne!(r.get(Reg::CHG_CNFG_00) & bits::WDTEN, 0);
        assert_ne!(r.get(Reg::CHG_CNFG_02) & bits::OTG_ILIM_1200, 0);
        // CHGIN stays masked until the startup delay has passed.
        assert_eq!(r.get(Reg::CHG_INT_MASK), 0x4a);
    });
    assert!(charger.is_pending(Work::EnableChgInIrq));
    assert!(charger.is_pending(Work::Watchdog));

    time.advance(3000);
    charger.run_due_work().await;
    regs(&bus, |r| assert_eq!(r.get(Reg::CHG_INT_MASK), 0x0a));
    assert!(!charger.is_pending(Work::EnableChgInIrq));
}

#[tokio::test]
async fn init_without_pmic_fails() {
    let bus = bus();
    let time = MockTime::default();
    regs(&bus, |r| r.fail(Reg::PMIC_REVISION));
    let mut charger = charger(&bus, &time);

    assert_eq!(
        charger.init(InterruptLines::all()).await,
        Err(Error::DeviceNotFound)
    );
}

#[tokio::test]
async fn mains_waits_for_afc_before_full_profile() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_online(CableType::Mains).await.unwrap();

    let state = charger.state();
    assert_eq!(state.charging_current_max, 1000);
    assert_eq!(state.charging_current, 1000);
    assert!(state.afc_detect);
    assert!(state.is_charging);
    assert!(charger.is_pending(Work::AfcDetect));
    regs(&bus, |r| {
        assert_eq!(field::CHGIN_ILIM.extract(r.get(Reg::CHG_CNFG_09)), 30);
        assert_eq!(field::CHG_CC.extract(r.get(Reg::CHG_CNFG_02)), 20);
        assert_ne!(r.get(Reg::CHG_CNFG_00) & bits::CHG, 0);
        assert_ne!(r.get(Reg::CHG_CNFG_00) & bits::BUCK, 0);
        assert_eq!(field::CHGINSEL.extract(r.get(Reg::CHG_CNFG_12)), 1);
    });

    time.advance(2000);
    charger.run_due_work().await;

    let state = charger.state();
    assert_eq!(state.charging_current_max, 1800);
    assert_eq!(state.charging_current, 1800);
    assert!(!state.afc_detect);
    regs(&bus, |r| {
        assert_eq!(
            field::CHGIN_ILIM.extract(r.get(Reg::CHG_CNFG_09)),
            chgin_ilim_to_code(1800)
        );
    });
    assert!(charger.host().acquired.contains(&WakeSource::Afc));
    assert!(charger.host().wake_balanced());
}

#[tokio::test]
async fn charge_current_never_exceeds_input_ceiling() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();

    for cable in [CableType::HvMains, CableType::Usb, CableType::Wireless, CableType::Mains] {
        charger.set_online(cable).await.unwrap();
        for level in [100, 70, 30, 7, 0, 55, 100] {
            charger.set_siop_level(level).await.unwrap();
            let state = charger.state();
            assert!(
                state.charging_current <= state.charging_current_max,
                "{:?} at {}%: {} > {}",
                cable,
                level,
                state.charging_current,
                state.charging_current_max
            );
        }
    }
}

#[tokio::test]
async fn siop_caps_wired_currents() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.set_online(CableType::HvMains).await.unwrap();
    assert_eq!(charger.state().charging_current, 1650);

    charger.set_siop_level(50).await.unwrap();

    // 2800 * 50% = 1400, capped at the throttled charge limit.
    assert_eq!(charger.state().charging_current, 1000);
    regs(&bus, |r| {
        assert_eq!(
            field::CHGIN_ILIM.extract(r.get(Reg::CHG_CNFG_09)),
            chgin_ilim_to_code(1200)
        );
    });
    assert_eq!(charger.set_siop_level(101).await, Err(Error::InvalidValue));
    assert_eq!(charger.state().siop_level, 50);
}

#[tokio::test]
async fn wireless_ramp_reaches_close_target_in_one_tick() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_online(CableType::Wireless).await.unwrap();
    assert!(charger.is_pending(Work::WirelessRamp));
    assert_eq!(charger.state().wireless_ramp_target(), 900);

    charger.run_due_work().await;

    assert!(!charger.is_pending(Work::WirelessRamp));
    assert_eq!(charger.state().wireless_ramp_current(), 900);
    regs(&bus, |r| {
        assert_eq!(field::WCIN_ILIM.extract(r.get(Reg::CHG_CNFG_10)), 45);
        assert_eq!(field::CHGINSEL.extract(r.get(Reg::CHG_CNFG_12)), 0);
    });
    let host = charger.host();
    assert_eq!(host.acquired.iter().filter(|s| **s == WakeSource::WirelessRamp).count(), 1);
    assert!(host.wake_balanced());
}

#[tokio::test]
async fn wireless_ramp_retarget_keeps_progress() {
    let bus = bus();
    let time = MockTime::default();
    let config = ChargerConfig { wireless_ramp_step: 250, ..ChargerConfig::default() };
    let mut charger = charger_with(&bus, &time, config);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_online(CableType::Wireless).await.unwrap();
    charger.run_due_work().await;
    // The readback of an unprogrammed WCIN limit is 60mA.
    assert_eq!(charger.state().wireless_ramp_current(), 310);
    assert!(charger.is_pending(Work::WirelessRamp));

    charger.set_current_max(500).await.unwrap();
    assert_eq!(charger.state().wireless_ramp_current(), 310);
    assert_eq!(charger.state().wireless_ramp_target(), 500);

    charger.run_due_work().await;
    assert_eq!(charger.state().wireless_ramp_current(), 500);
    assert!(!charger.is_pending(Work::WirelessRamp));
    assert!(charger.host().wake_balanced());
}

#[tokio::test]
async fn wired_attach_cancels_wireless_ramp() {
    let bus = bus();
    let time = MockTime::default();
    let config = ChargerConfig { wireless_ramp_step: 100, ..ChargerConfig::default() };
    let mut charger = charger_with(&bus, &time, config);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_online(CableType::Wireless).await.unwrap();
    charger.run_due_work().await;
    assert!(charger.is_pending(Work::WirelessRamp));

    charger.set_online(CableType::Usb).await.unwrap();

    assert!(!charger.is_pending(Work::WirelessRamp));
    assert_eq!(charger.state().wireless_ramp_current(), 500);
    assert_eq!(charger.state().wireless_ramp_target(), 500);
    regs(&bus, |r| assert_eq!(r.get(Reg::CHG_CNFG_10), bits::WCIN_ILIM_DEFAULT));
    assert!(charger.host().wake_balanced());
}

#[tokio::test]
async fn aicl_backs_off_until_source_recovers() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.set_online(CableType::Mains).await.unwrap();
    assert_eq!(charger.state().charging_current_max, 1000);

    // AICL status clear for three reads, then set.
    regs(&bus, |r| r.script(Reg::CHG_INT_OK, &[0x40, 0x40, 0x40, 0xc0]));
    charger.handle_event(Event::Aicl).await;
    assert!(charger.is_pending(Work::Aicl));
    time.advance(50);
    charger.run_due_work().await;

    let state = charger.state();
    assert_eq!(state.charging_current_max, 700);
    assert!(!state.aicl_active);
    assert_eq!(state.charge_type(), ChargeType::Fast);
    regs(&bus, |r| assert_eq!(field::CHGIN_ILIM.extract(r.get(Reg::CHG_CNFG_09)), 21));
    assert!(!charger.host().reported(Report::SlowCharging));

    // AICL settled the adapter question, so the AFC timer leaves the limit alone.
    time.advance(2000);
    charger.run_due_work().await;
    assert_eq!(charger.state().charging_current_max, 700);
    assert!(charger.host().wake_balanced());
}

#[tokio::test]
async fn aicl_stops_at_minimum_and_flags_slow_charging() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.set_online(CableType::Mains).await.unwrap();

    regs(&bus, |r| r.set(Reg::CHG_INT_OK, 0x40));
    charger.handle_event(Event::Aicl).await;
    time.advance(50);
    charger.run_due_work().await;

    let state = charger.state();
    assert_eq!(state.charging_current_max, 300);
    assert!(state.aicl_active);
    assert_eq!(state.charge_type(), ChargeType::Slow);
    regs(&bus, |r| {
        assert_eq!(field::CHGIN_ILIM.extract(r.get(Reg::CHG_CNFG_09)), 9);
        // 1000mA down to the 300mA floor is seven reductions.
        assert_eq!(r.writes_to(Reg::CHG_CNFG_09) - 1, 7);
    });
    assert!(charger.host().reported(Report::SlowCharging));
}

#[tokio::test]
async fn aicl_is_off_for_high_voltage_adapters() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.set_online(CableType::HvMains).await.unwrap();

    let aicl = 0x80;
    regs(&bus, |r| assert_eq!(r.get(Reg::CHG_INT_MASK) & aicl, aicl));
    charger.handle_event(Event::Aicl).await;
    assert!(!charger.is_pending(Work::Aicl));

    charger.set_online(CableType::Battery).await.unwrap();
    regs(&bus, |r| assert_eq!(r.get(Reg::CHG_INT_MASK) & aicl, 0));
}

#[tokio::test]
async fn negotiated_voltage_holds_ta_ceiling_until_timer() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.set_online(CableType::HvMains).await.unwrap();
    assert_eq!(charger.state().charging_current_max, 1650);

    charger.set_negotiated_voltage(9).await.unwrap();
    assert_eq!(charger.state().charging_current_max, 1000);
    assert_eq!(charger.state().vbus_negotiated_voltage, 9);
    assert!(charger.host().reported(Report::AfcVoltage(9)));
    regs(&bus, |r| assert_eq!(field::CHGIN_ILIM.extract(r.get(Reg::CHG_CNFG_09)), 30));

    assert_eq!(charger.set_negotiated_voltage(12).await, Err(Error::InvalidValue));

    time.advance(2000);
    charger.run_due_work().await;
    assert_eq!(charger.state().charging_current_max, 1650);
    assert_eq!(charger.state().vbus_negotiated_voltage, 0);
    assert!(charger.host().wake_balanced());
}

#[tokio::test]
async fn otg_saves_and_restores_interrupt_mask() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    let mask = regs(&bus, |r| r.get(Reg::CHG_INT_MASK));

    charger.set_otg(true).await.unwrap();
    assert!(charger.otg_enabled().await.unwrap());
    regs(&bus, |r| {
        assert_eq!(r.get(Reg::CHG_CNFG_11), bits::VBYPSET_OTG);
        let int_mask = r.get(Reg::CHG_INT_MASK);
        assert_eq!(int_mask & 0x50, 0x50);
        assert_eq!(int_mask & 0x01, 0);
    });

    charger.set_otg(false).await.unwrap();
    assert!(!charger.otg_enabled().await.unwrap());
    regs(&bus, |r| {
        assert_eq!(r.get(Reg::CHG_CNFG_11), 0);
        assert_ne!(r.get(Reg::CHG_CNFG_00) & bits::BUCK, 0);
        assert_eq!(r.get(Reg::CHG_INT_MASK), mask);
    });
    let host = charger.host();
    assert!(host.reported(Report::WirelessOtg(true)));
    assert!(host.reported(Report::WirelessOtg(false)));
}

#[tokio::test]
async fn otg_cable_boosts_without_charging() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_online(CableType::Otg).await.unwrap();

    assert!(!charger.state().is_charging);
    regs(&bus, |r| {
        let cnfg = r.get(Reg::CHG_CNFG_00);
        assert_eq!(cnfg & bits::OTG_CTRL, bits::OTG_CTRL);
        assert_eq!(cnfg & bits::CHG, 0);
    });
}

#[tokio::test]
async fn usb_high_current_uses_mains_profile() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_usb_hc(true).await.unwrap();
    charger.set_online(CableType::Usb).await.unwrap();
    assert_eq!(charger.state().charging_current_max, 1800);

    charger.set_usb_hc(false).await.unwrap();
    charger.set_online(CableType::Usb).await.unwrap();
    assert_eq!(charger.state().charging_current_max, 500);
}

#[tokio::test]
async fn shutdown_leaves_safe_configuration() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.set_online(CableType::Mains).await.unwrap();

    charger.shutdown().await.unwrap();

    assert!(!charger.is_pending(Work::AfcDetect));
    assert!(!charger.is_pending(Work::Watchdog));
    assert!(charger.host().wake_balanced());
    regs(&bus, |r| {
        assert_eq!(r.get(Reg::CHG_CNFG_00), 0x04);
        assert_eq!(r.get(Reg::CHG_CNFG_09), 0x0f);
        assert_eq!(r.get(Reg::CHG_CNFG_10), 0x19);
        assert_eq!(r.get(Reg::CHG_CNFG_12), 0x67);
    });
}

#[tokio::test]
async fn locked_charger_is_unlocked_and_reinitialized() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    regs(&bus, |r| {
        r.set(Reg::CHG_CNFG_06, 0x00);
        r.set(Reg::CHG_CNFG_01, 0x00);
    });

    charger.set_online(CableType::Usb).await.unwrap();

    regs(&bus, |r| {
        assert_eq!(field::CHGPROT.extract(r.get(Reg::CHG_CNFG_06)), bits::CHGPROT_UNLOCKED);
        assert_eq!(r.get(Reg::CHG_CNFG_01), bits::CNFG_01_DEFAULT);
    });
}

#[tokio::test]
async fn unlock_gives_up_after_bounded_retries() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    regs(&bus, |r| {
        r.set(Reg::CHG_CNFG_06, 0x00);
        r.stick(Reg::CHG_CNFG_06);
    });
    let before = time.now_ms();

    charger.set_online(CableType::Usb).await.unwrap();

    assert_eq!(time.now_ms() - before, 10 * 20);
    // Regulation still went ahead.
    assert_eq!(charger.state().charging_current_max, 500);
}

#[tokio::test]
async fn bus_errors_surface_from_setters() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    regs(&bus, |r| r.fail(Reg::CHG_CNFG_04));

    assert_eq!(charger.set_float_voltage(4200).await, Err(Error::Bus(BusFault)));
    assert_eq!(charger.state().float_voltage, 4350);
    assert_eq!(charger.set_float_voltage(5000).await, Err(Error::InvalidValue));
}

#[tokio::test]
async fn full_check_by_charger_second_stage_disables_charging() {
    let bus = bus();
    let time = MockTime::default();
    let config = ChargerConfig { full_check_by_charger: true, ..ChargerConfig::default() };
    let mut charger = charger_with(&bus, &time, config);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_online(CableType::Usb).await.unwrap();
    // Revision 2: 275mA is code 2, timer 70 minutes.
    regs(&bus, |r| assert_eq!(r.get(Reg::CHG_CNFG_03), 0x02 | (7 << 3)));

    charger.host_mut().charge_mode = ChargeMode::SecondStage;
    charger.set_online(CableType::Usb).await.unwrap();
    // 150mA is code 0.
    regs(&bus, |r| assert_eq!(r.get(Reg::CHG_CNFG_03), 7 << 3));
}

#[tokio::test]
async fn wireless_input_trims_to_measured_draw() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.host_mut().capacity = 96;
    charger.host_mut().average_current = 400;

    charger.set_online(CableType::Wireless).await.unwrap();
    // 400 + 150, rounded down to 20mA.
    assert_eq!(charger.state().wireless_ramp_target(), 540);

    charger.host_mut().average_current = 333;
    charger.set_current_max(900).await.unwrap();
    assert_eq!(charger.state().wireless_ramp_target(), 480);

    // Floored at 250mA, then rounded.
    charger.host_mut().average_current = -300;
    charger.set_current_max(900).await.unwrap();
    assert_eq!(charger.state().wireless_ramp_target(), 240);

    charger.set_lcd_on(true);
    charger.set_current_max(900).await.unwrap();
    assert_eq!(charger.state().wireless_ramp_target(), 900);

    charger.set_lcd_on(false);
    charger.set_call_on(true);
    charger.set_current_max(900).await.unwrap();
    assert_eq!(charger.state().wireless_ramp_target(), 900);
    charger.set_call_on(false);

    // Below 95% only the charge phase triggers the trim.
    charger.host_mut().capacity = 50;
    charger.set_current_max(900).await.unwrap();
    assert_eq!(charger.state().wireless_ramp_target(), 900);

    regs(&bus, |r| r.set(Reg::CHG_DETAILS_01, 0x32));
    charger.set_current_max(900).await.unwrap();
    assert_eq!(charger.state().wireless_ramp_target(), 240);
}

#[tokio::test]
async fn smart_dock_profiles_follow_mdock() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_online(CableType::MdockTa).await.unwrap();
    assert!(charger.state().mdock);
    assert_eq!(charger.state().charging_current_max, 1700);

    charger.set_online(CableType::SmartOtg).await.unwrap();
    assert_eq!(charger.state().charging_current_max, 1200);
    assert_eq!(charger.state().charging_current, 1200);

    charger.set_online(CableType::SmartNotg).await.unwrap();
    assert_eq!(charger.state().charging_current_max, 1700);
    assert_eq!(charger.state().charging_current, 1700);

    // Unplugging forgets the dock.
    charger.set_online(CableType::Battery).await.unwrap();
    assert!(!charger.state().mdock);
    charger.set_online(CableType::SmartOtg).await.unwrap();
    assert_eq!(charger.state().charging_current_max, 1000);
}

#[tokio::test]
async fn lan_hub_charges_instead_of_boosting() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_otg(true).await.unwrap();
    charger.set_online(CableType::Usb).await.unwrap();
    regs(&bus, |r| assert_eq!(r.get(Reg::CHG_CNFG_00) & bits::OTG_CTRL, bits::OTG_CTRL));

    charger.set_online(CableType::LanHub).await.unwrap();

    assert!(charger.state().is_charging);
    regs(&bus, |r| {
        let cnfg = r.get(Reg::CHG_CNFG_00);
        assert_ne!(cnfg & bits::CHG, 0);
        assert_eq!(cnfg & bits::OTG_CTRL, 0);
    });
}

#[tokio::test]
async fn swelling_clamps_charge_current() {
    let bus = bus();
    let time = MockTime::default();
    let config = ChargerConfig { swelling: true, ..ChargerConfig::default() };
    let mut charger = charger_with(&bus, &time, config);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.host_mut().swelling = true;

    charger.set_online(CableType::HvMains).await.unwrap();
    assert_eq!(charger.state().charging_current, 1000);
    regs(&bus, |r| {
        assert_eq!(field::CHG_CC.extract(r.get(Reg::CHG_CNFG_02)), fast_charge_to_code(1000));
    });

    charger.set_charging_current(500).await.unwrap();
    assert_eq!(charger.state().charging_current, 500);

    // Above the 2800mA profile: ignored.
    charger.set_charging_current(3000).await.unwrap();
    assert_eq!(charger.state().charging_current, 500);
}

#[tokio::test]
async fn delayed_wireless_current_skips_regulation() {
    let bus = bus();
    let time = MockTime::default();
    let config = ChargerConfig { wpc_delayed_current: Some(660), ..ChargerConfig::default() };
    let mut charger = charger_with(&bus, &time, config);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.set_online(CableType::Wireless).await.unwrap();
    charger.set_siop_level(50).await.unwrap();
    let writes = regs(&bus, |r| r.writes_to(Reg::CHG_CNFG_02));

    charger.set_current_max(660).await.unwrap();
    assert_eq!(charger.state().charging_current_max, 660);
    regs(&bus, |r| assert_eq!(r.writes_to(Reg::CHG_CNFG_02), writes));

    charger.set_current_max(700).await.unwrap();
    regs(&bus, |r| assert_eq!(r.writes_to(Reg::CHG_CNFG_02), writes + 1));
}

#[tokio::test]
async fn high_voltage_mains_switches_at_2mhz() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();

    for (cable, fast) in [
        (CableType::HvMains, true),
        (CableType::Usb, false),
        (CableType::HvErr, true),
        (CableType::Mains, false),
    ] {
        charger.set_online(cable).await.unwrap();
        let fq = regs(&bus, |r| r.get(Reg::CHG_CNFG_01) & bits::FQ_2MHZ);
        assert_eq!(fq != 0, fast, "{:?}", cable);
    }

    let bus = common::bus();
    let config = ChargerConfig { fixed_switching_frequency: true, ..ChargerConfig::default() };
    let mut charger = charger_with(&bus, &time, config);
    charger.init(InterruptLines::all()).await.unwrap();
    charger.set_online(CableType::HvMains).await.unwrap();
    regs(&bus, |r| assert_eq!(r.get(Reg::CHG_CNFG_01) & bits::FQ_2MHZ, 0));
}

#[tokio::test]
async fn discharging_on_battery_restores_wireless_limit() {
    let bus = bus();
    let time = MockTime::default();
    let mut charger = charger(&bus, &time);
    charger.init(InterruptLines::all()).await.unwrap();

    charger.set_status(ChargingStatus::Charging);
    regs(&bus, |r| r.writes.clear());
    charger.set_online(CableType::Battery).await.unwrap();
    regs(&bus, |r| assert_eq!(r.writes_to(Reg::CHG_CNFG_10), 0));

    charger.set_status(ChargingStatus::Discharging);
    charger.set_online(CableType::Battery).await.unwrap();

    assert_eq!(charger.state().charging_current_max, 500);
    regs(&bus, |r| {
        assert_eq!(r.writes_to(Reg::CHG_CNFG_10), 1);
        assert_eq!(field::WCIN_ILIM.extract(r.get(Reg::CHG_CNFG_10)), wcin_ilim_to_code(500));
    });
}
