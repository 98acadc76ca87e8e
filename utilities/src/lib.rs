pub mod command_executor;
pub mod device_link;
pub mod lazy_serial;
pub mod motor_driver;
