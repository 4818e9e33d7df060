//! BLE peripheral side: advertising payload, radio interface and the UART
//! bridge.

pub mod advertising;
pub mod radio;
pub mod uart;

pub use advertising::{AdvFlags, AdvertisingBuilder, AdvertisingPayload, MAX_ADV_LEN, ServiceUuid};
pub use radio::{AttrHandle, BleEvent, BleEventChannel, BleRadio, ConnHandle, UartHandles, post_event};
pub use uart::{BleUartBridge, ConnectionSet, SendReport};
