use core::fmt;
use core::ops::{Deref, DerefMut};

pub type VirtAddr = usize;
pub type PhysAddr = usize;

#[repr(transparent)]
pub struct Reg16(volatile_register::RW<u16>);

#[repr(transparent)]
pub struct Reg32(volatile_register::RW<u32>);

impl fmt::Debug for Reg16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Reg16[RW] {:#06x}", self.0.read()))
    }
}

impl fmt::Debug for Reg32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Reg32[RW] {:#010x}", self.0.read()))
    }
}

impl Reg16 {
    pub fn read(&self) -> u16 {
        self.0.read()
    }

    pub fn write(&mut self, val: u16) {
        unsafe { self.0.write(val) };
    }

    pub fn modify<F: Fn(u16) -> u16>(&mut self, f: F) {
        unsafe { self.0.modify(f) };
    }
}

impl Reg32 {
    pub fn read(&self) -> u32 {
        self.0.read()
    }

    pub fn write(&mut self, val: u32) {
        unsafe { self.0.write(val) };
    }

    pub fn modify<F: Fn(u32) -> u32>(&mut self, f: F) {
        unsafe { self.0.modify(f) };
    }
}

/// View of a register block at an address the platform has already mapped.
pub struct Mmio<'a, T> {
    ptr: &'a mut T,
}

impl<T> Mmio<'_, T> {
    /// # Safety
    ///
    /// `addr` must be the mapped base of a live `T` register block and must
    /// not be aliased by any other handle for the lifetime of this one.
    pub unsafe fn from_raw(addr: VirtAddr) -> Self {
        Self {
            ptr: &mut *(addr as *mut T),
        }
    }
}

impl<T> Deref for Mmio<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.ptr
    }
}

impl<T> DerefMut for Mmio<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ptr
    }
}
