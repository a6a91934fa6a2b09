//! Inverter connection and register map.

use clap::Parser;

use crate::api::inverter::{Inverter, dry_run::DryRun, modbus::ModbusConnector};

#[derive(Parser)]
pub struct DeviceArgs {
    /// Modbus TCP gateway address as `host:port`.
    #[clap(long = "inverter-address", env = "INVERTER_ADDRESS", default_value = "ew11-1:502")]
    pub address: String,

    #[clap(long = "inverter-slave-id", env = "INVERTER_SLAVE_ID", default_value = "1")]
    pub slave_id: u8,

    #[clap(flatten)]
    pub registers: Registers,
}

impl DeviceArgs {
    /// In dummy mode, the writes never reach the device.
    pub fn inverter(&self, dummy: bool) -> Inverter {
        let connector = ModbusConnector { address: self.address.clone(), slave_id: self.slave_id };
        if dummy {
            Inverter::new(Box::new(DryRun(connector)), self.registers)
        } else {
            Inverter::new(Box::new(connector), self.registers)
        }
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, Parser)]
pub struct Registers {
    /// Input register of the battery state-of-charge percentage.
    #[clap(
        long = "state-of-charge-register",
        env = "STATE_OF_CHARGE_REGISTER",
        default_value = "1014"
    )]
    pub state_of_charge: u16,

    /// First holding register of the charging slots 1 to 3.
    #[clap(
        long = "first-slot-bank-register",
        env = "FIRST_SLOT_BANK_REGISTER",
        default_value = "1100"
    )]
    pub first_slot_bank: u16,

    /// First holding register of the charging slots 4 to 6.
    #[clap(
        long = "second-slot-bank-register",
        env = "SECOND_SLOT_BANK_REGISTER",
        default_value = "1017"
    )]
    pub second_slot_bank: u16,

    #[clap(
        long = "max-state-of-charge-register",
        env = "MAX_STATE_OF_CHARGE_REGISTER",
        default_value = "1091"
    )]
    pub max_state_of_charge: u16,

    #[clap(
        long = "ac-charge-enable-register",
        env = "AC_CHARGE_ENABLE_REGISTER",
        default_value = "1092"
    )]
    pub ac_charge_enable: u16,

    /// First holding register of the 7-word date and time block.
    #[clap(long = "clock-register", env = "CLOCK_REGISTER", default_value = "45")]
    pub clock: u16,

    /// Input registers of the lifetime runtime in half-seconds.
    #[clap(long = "runtime-register", env = "RUNTIME_REGISTER", default_value = "57")]
    pub runtime: u16,

    /// Input registers of the lifetime load in tenths of a kilowatt-hour.
    #[clap(long = "total-load-register", env = "TOTAL_LOAD_REGISTER", default_value = "1062")]
    pub total_load: u16,
}
