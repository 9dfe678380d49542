//! An ideal 23-series SRAM behind fake SPI and CS peripherals.
//!
//! Used where the data is what matters; exact wire traffic is checked with
//! the doubles in `mock`.

use core::convert::Infallible;
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug)]
pub struct SpiFault;

#[derive(Debug)]
pub struct Device {
    pub memory: Vec<u8>,
    mode_register: u8,
    frame: Vec<u8>,
    address: usize,
}

impl Device {
    fn shift(&mut self, mosi: u8) -> u8 {
        self.frame.push(mosi);

        let n = self.frame.len();
        match self.frame[0] {
            0x02 | 0x03 if n == 4 => {
                self.address = usize::from(self.frame[1]) << 16
                    | usize::from(self.frame[2]) << 8
                    | usize::from(self.frame[3]);
                0
            }
            0x02 if n > 4 => {
                let len = self.memory.len();
                self.memory[self.address % len] = mosi;
                self.address += 1;
                0
            }
            0x03 if n > 4 => {
                let len = self.memory.len();
                let byte = self.memory[self.address % len];
                self.address += 1;
                byte
            }
            0x01 if n == 2 => {
                self.mode_register = mosi;
                0
            }
            0x05 if n == 2 => self.mode_register,
            _ => 0,
        }
    }
}

#[derive(Debug)]
pub struct FakeSpi(pub Rc<RefCell<Device>>);

#[derive(Debug)]
pub struct FakeCs(pub Rc<RefCell<Device>>);

impl Transfer<u8> for FakeSpi {
    type Error = SpiFault;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], SpiFault> {
        let mut device = self.0.borrow_mut();
        for word in words.iter_mut() {
            *word = device.shift(*word);
        }
        Ok(words)
    }
}

impl OutputPin for FakeCs {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().frame.clear();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Creates a device of `len` bytes, filled with `0xAA`.
pub fn bus(len: usize) -> (Rc<RefCell<Device>>, FakeSpi, FakeCs) {
    let device = Rc::new(RefCell::new(Device {
        memory: vec![0xAA; len],
        mode_register: 0b0100_0000,
        frame: Vec::new(),
        address: 0,
    }));
    let spi = FakeSpi(device.clone());
    let cs = FakeCs(device.clone());
    (device, spi, cs)
}
