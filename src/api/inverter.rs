//! GivEnergy-style inverter over Modbus: battery readings, the clock, and the charging schedule.

pub mod dry_run;
pub mod modbus;
pub mod transport;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use self::transport::{Connect, DeviceCommunicationError, RegisterKind, Session};
use crate::{
    cli::device::Registers,
    core::schedule::{DeviceSchedule, N_BANK_WORDS},
    prelude::*,
    quantity::{energy::KilowattHours, percent::Percent},
};

/// Device clock may lag or lead the host by this much before it gets corrected.
const MAX_CLOCK_DRIFT: TimeDelta = TimeDelta::seconds(30);

pub struct Inverter {
    connector: Box<dyn Connect>,
    registers: Registers,
}

impl Inverter {
    pub fn new(connector: Box<dyn Connect>, registers: Registers) -> Self {
        Self { connector, registers }
    }

    #[instrument(skip_all)]
    pub async fn read_state_of_charge(&self) -> Result<Percent, DeviceCommunicationError> {
        let address = self.registers.state_of_charge;
        let mut session = self.connector.connect().await?;
        let result = read_exact::<1>(&mut *session, RegisterKind::Input, address).await;
        let [value] = close(session, result).await?;
        if value > Percent::HUNDRED.0 {
            return Err(DeviceCommunicationError::Malformed {
                address,
                reason: format!("state of charge of {value}%"),
            });
        }
        let state_of_charge = Percent(value);
        info!(?state_of_charge, "fetched");
        Ok(state_of_charge)
    }

    /// Lifetime load over the lifetime runtime, scaled to a day.
    #[instrument(skip_all)]
    pub async fn read_average_daily_load(&self) -> Result<KilowattHours, DeviceCommunicationError> {
        let mut session = self.connector.connect().await?;
        let result = async {
            let registers = self.registers;
            let runtime =
                read_exact::<2>(&mut *session, RegisterKind::Input, registers.runtime).await?;
            let total_load =
                read_exact::<2>(&mut *session, RegisterKind::Input, registers.total_load).await?;
            Ok::<_, DeviceCommunicationError>((runtime, total_load))
        }
        .await;
        let (runtime, total_load) = close(session, result).await?;

        // Half-seconds:
        let runtime = u32_from_words(runtime);
        if runtime == 0 {
            return Err(DeviceCommunicationError::Malformed {
                address: self.registers.runtime,
                reason: "zero runtime".to_string(),
            });
        }
        let runtime_hours = f64::from(runtime) * 0.5 / 3600.0;
        let total_load = KilowattHours::from_hectowatt_hours(u32_from_words(total_load));
        let daily_load = total_load * (24.0 / runtime_hours);
        info!(?total_load, runtime_hours, ?daily_load, "estimated the daily load");
        Ok(daily_load)
    }

    #[instrument(skip_all)]
    pub async fn read_schedule(&self) -> Result<DeviceSchedule, DeviceCommunicationError> {
        let mut session = self.connector.connect().await?;
        let result = async {
            let registers = self.registers;
            let first =
                read_exact(&mut *session, RegisterKind::Holding, registers.first_slot_bank).await?;
            let second =
                read_exact(&mut *session, RegisterKind::Holding, registers.second_slot_bank).await?;
            Ok::<_, DeviceCommunicationError>((first, second))
        }
        .await;
        let (first, second) = close(session, result).await?;
        Ok(DeviceSchedule::from_banks(first, second))
    }

    /// Set the device clock to the host local time, unless it is already close enough.
    ///
    /// Returns whether the clock has been written.
    #[instrument(skip_all, fields(%now))]
    pub async fn sync_clock(&self, now: NaiveDateTime) -> Result<bool, DeviceCommunicationError> {
        let address = self.registers.clock;
        let mut session = self.connector.connect().await?;
        let result = async {
            // Year − 2000, month, day, hour, minute, second, and the day of week:
            let words = read_exact::<7>(&mut *session, RegisterKind::Holding, address).await?;
            let device_time = decode_clock(&words);
            let drift = device_time.map(|device_time| (device_time - now).abs());
            if drift.is_some_and(|drift| drift <= MAX_CLOCK_DRIFT) {
                debug!(?drift, "the clock is fine");
                return Ok::<_, DeviceCommunicationError>(false);
            }
            warn!(?device_time, "adjusting the device clock…");
            session.write(address, &encode_clock(address, now)?).await?;
            Ok(true)
        }
        .await;
        close(session, result).await
    }

    /// Replace the charging slots and the charging settings.
    ///
    /// All the slots get disabled first so that no stale slot survives a partial write.
    #[instrument(skip_all, fields(?max_state_of_charge, is_ac_charge_enabled))]
    pub async fn apply(
        &self,
        schedule: &DeviceSchedule,
        max_state_of_charge: Percent,
        is_ac_charge_enabled: bool,
    ) -> Result<(), DeviceCommunicationError> {
        info!(n_enabled = schedule.enabled().count(), "applying the schedule…");
        let [first, second] = schedule.to_banks();
        let mut session = self.connector.connect().await?;
        let result = async {
            let empty = [0; N_BANK_WORDS];
            session.write(self.registers.first_slot_bank, &empty).await?;
            session.write(self.registers.second_slot_bank, &empty).await?;
            session.write(self.registers.first_slot_bank, &first).await?;
            session.write(self.registers.second_slot_bank, &second).await?;
            session.write(self.registers.max_state_of_charge, &[max_state_of_charge.0]).await?;
            let ac_charge_enable = [u16::from(is_ac_charge_enabled)];
            session.write(self.registers.ac_charge_enable, &ac_charge_enable).await?;
            Ok::<_, DeviceCommunicationError>(())
        }
        .await;
        close(session, result).await?;
        info!("applied");
        Ok(())
    }
}

#[expect(clippy::cast_possible_truncation)]
async fn read_exact<const N: usize>(
    session: &mut dyn Session,
    kind: RegisterKind,
    address: u16,
) -> Result<[u16; N], DeviceCommunicationError> {
    let words = session.read(kind, address, N as u16).await?;
    <[u16; N]>::try_from(words.as_slice()).map_err(|_| DeviceCommunicationError::ShortRead {
        address,
        expected: N,
        actual: words.len(),
    })
}

/// Disconnect regardless of the outcome, the operation error takes precedence.
async fn close<T>(
    mut session: Box<dyn Session>,
    result: Result<T, DeviceCommunicationError>,
) -> Result<T, DeviceCommunicationError> {
    let disconnected = session.disconnect().await;
    let value = result?;
    if let Err(error) = disconnected {
        warn!("failed to disconnect: {error:#}");
    }
    Ok(value)
}

/// Counters are stored high word first.
fn u32_from_words([high, low]: [u16; 2]) -> u32 {
    (u32::from(high) << 16) | u32::from(low)
}

fn decode_clock(words: &[u16; 7]) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2000 + i32::from(words[0]), u32::from(words[1]), u32::from(words[2]))?
        .and_hms_opt(u32::from(words[3]), u32::from(words[4]), u32::from(words[5]))
}

fn encode_clock(address: u16, now: NaiveDateTime) -> Result<[u16; 6], DeviceCommunicationError> {
    let year = u16::try_from(now.year() - 2000).map_err(|_| DeviceCommunicationError::Malformed {
        address,
        reason: format!("year {} does not fit the device clock", now.year()),
    })?;
    #[expect(clippy::cast_possible_truncation)]
    let words = [
        year,
        now.month() as u16,
        now.day() as u16,
        now.hour() as u16,
        now.minute() as u16,
        now.second() as u16,
    ];
    Ok(words)
}
