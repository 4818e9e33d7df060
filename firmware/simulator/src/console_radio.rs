//! Radio that prints what a central would see.

use std::convert::Infallible;

use canbridge_common::ble::{AttrHandle, BleRadio, ConnHandle, UartHandles};

pub struct ConsoleRadio {
    handles: UartHandles,
    notifications: usize,
}

impl ConsoleRadio {
    pub const fn new() -> Self {
        Self {
            handles: UartHandles {
                tx: AttrHandle(0x0010),
                rx: AttrHandle(0x0012),
            },
            notifications: 0,
        }
    }

    pub const fn notifications(&self) -> usize { self.notifications }
}

impl BleRadio for ConsoleRadio {
    type Error = Infallible;

    fn set_active(
        &mut self,
        active: bool,
    ) -> Result<(), Self::Error> {
        println!("[ble] radio {}", if active { "on" } else { "off" });
        Ok(())
    }

    fn register_uart_service(&mut self) -> Result<UartHandles, Self::Error> {
        println!("[ble] UART service registered, tx={:#06x}", self.handles.tx.0);
        Ok(self.handles)
    }

    fn advertise(
        &mut self,
        interval_us: u32,
        payload: &[u8],
    ) -> Result<(), Self::Error> {
        let hex: String = payload.iter().map(|b| format!("{b:02x}")).collect();
        println!("[ble] advertising every {} ms: {hex}", interval_us / 1000);
        Ok(())
    }

    fn notify(
        &mut self,
        conn: ConnHandle,
        _attr: AttrHandle,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        self.notifications += 1;
        print!("[ble] -> conn {}: {}", conn.0, String::from_utf8_lossy(data));
        Ok(())
    }
}
