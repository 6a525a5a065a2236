/// Attached power source, as classified by the host.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CableType {
    /// Not yet classified.
    #[default]
    Unknown,
    /// No external source. The system runs from the battery.
    Battery,
    /// Uninterruptible supply.
    Ups,
    /// Wall adapter.
    Mains,
    /// Standard downstream USB port.
    Usb,
    /// USB dedicated charging port.
    UsbDcp,
    /// USB charging downstream port.
    UsbCdp,
    /// USB accessory charger adapter.
    UsbAca,
    /// We are sourcing current to an accessory.
    Otg,
    /// Desk dock.
    Dock,
    /// Powered LAN hub. Charges while the hub is powered.
    LanHub,
    /// Multimedia dock fed by a travel adapter.
    MdockTa,
    /// Smart dock with an OTG accessory attached.
    SmartOtg,
    /// Smart dock without an OTG accessory.
    SmartNotg,
    /// Wireless charging pad.
    Wireless,
    /// High voltage wireless charging pad.
    HvWireless,
    /// PMA wireless charging pad.
    PmaWireless,
    /// Sharing battery power with another device.
    PowerSharing,
    /// High voltage (AFC) wall adapter.
    HvMains,
    /// High voltage adapter that failed negotiation.
    HvErr,
    /// High voltage adapter not yet identified.
    HvUnknown,
    /// High voltage adapter with a charging limit applied.
    HvMainsChgLimit,
    /// Head-mounted theater accessory. Powered but not charging.
    HmtConnected,
}

impl CableType {
    /// Number of cable types.
    pub const COUNT: usize = 23;

    /// Every cable type, in index order.
    pub const ALL: [CableType; Self::COUNT] = [
        CableType::Unknown,
        CableType::Battery,
        CableType::Ups,
        CableType::Mains,
        CableType::Usb,
        CableType::UsbDcp,
        CableType::UsbCdp,
        CableType::UsbAca,
        CableType::Otg,
        CableType::Dock,
        CableType::LanHub,
        CableType::MdockTa,
        CableType::SmartOtg,
        CableType::SmartNotg,
        CableType::Wireless,
        CableType::HvWireless,
        CableType::PmaWireless,
        CableType::PowerSharing,
        CableType::HvMains,
        CableType::HvErr,
        CableType::HvUnknown,
        CableType::HvMainsChgLimit,
        CableType::HmtConnected,
    ];

    /// Position in a [`crate::ProfileTable`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Powered through the WCIN path.
    pub const fn is_wireless(self) -> bool {
        matches!(self, CableType::Wireless | CableType::HvWireless | CableType::PmaWireless)
    }

    /// Wired high voltage adapter.
    pub const fn is_hv_wire(self) -> bool {
        matches!(self, CableType::HvMains | CableType::HvErr | CableType::HvUnknown)
    }

    /// No external source is feeding the charger.
    pub const fn is_unpowered(self) -> bool {
        matches!(self, CableType::Battery | CableType::Otg)
    }
}
