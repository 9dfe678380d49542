//! `mockall` doubles for the SPI master and the CS pin.
//!
//! Both halves forward to one [`MockBus`], so a single `Sequence` orders
//! CS edges and transfers against each other.

use core::convert::Infallible;
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;
use mockall::automock;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug)]
pub struct SpiFault;

#[automock]
pub trait Bus {
    fn select(&mut self);
    fn deselect(&mut self);
    /// Shifts out `tx`, returns the bytes shifted in.
    fn transfer(&mut self, tx: &[u8]) -> Result<Vec<u8>, SpiFault>;
}

pub struct BusSpi(Rc<RefCell<MockBus>>);

pub struct BusCs(Rc<RefCell<MockBus>>);

impl Transfer<u8> for BusSpi {
    type Error = SpiFault;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], SpiFault> {
        let rx = self.0.borrow_mut().transfer(words)?;
        words.copy_from_slice(&rx);
        Ok(words)
    }
}

impl OutputPin for BusCs {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().deselect();
        Ok(())
    }
}

/// Splits a prepared mock into the SPI and CS halves.
pub fn split(bus: MockBus) -> (BusSpi, BusCs) {
    let bus = Rc::new(RefCell::new(bus));
    (BusSpi(bus.clone()), BusCs(bus))
}
