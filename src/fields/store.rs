use datasize::DataSize;

use super::{Channels, Register, EXTRA_COUNT, REGISTER_COUNT, SOURCE_COUNT};

/// The full set of time-level registers for every evolved field of one patch.
#[derive(Clone, Debug, Default, DataSize)]
pub struct Registers {
    pub previous: Channels,
    pub active: Channels,
    pub final_: Channels,
    pub scratch: Channels,
    pub stages: [Channels; 4],
}

impl Registers {
    fn get(&self, register: Register) -> &Channels {
        match register {
            Register::Previous => &self.previous,
            Register::Active => &self.active,
            Register::Final => &self.final_,
            Register::Scratch => &self.scratch,
            Register::Stage(n) => &self.stages[Register::Stage(n).slot() - 4],
        }
    }

    fn get_mut(&mut self, register: Register) -> &mut Channels {
        match register {
            Register::Previous => &mut self.previous,
            Register::Active => &mut self.active,
            Register::Final => &mut self.final_,
            Register::Scratch => &mut self.scratch,
            Register::Stage(n) => &mut self.stages[Register::Stage(n).slot() - 4],
        }
    }
}

/// Storage of every field register of one patch over its ghost-inclusive extent.
///
/// Every allocated register has identical extent. Sources and extras carry a single
/// time level.
#[derive(Clone, Debug, DataSize)]
pub struct FieldStore {
    points: usize,
    fields: usize,
    allocated: [bool; REGISTER_COUNT],
    registers: Registers,
    sources: Channels,
    extras: Channels,
}

impl FieldStore {
    /// Creates storage for `fields` channels over `points` grid points, with every
    /// register allocated and zeroed.
    pub fn new(fields: usize, points: usize) -> Self {
        let mut result = Self {
            points,
            fields,
            allocated: [false; REGISTER_COUNT],
            registers: Registers::default(),
            sources: Channels::new(SOURCE_COUNT, points),
            extras: Channels::new(EXTRA_COUNT, points),
        };

        for register in Register::ALL {
            result.allocate(register);
        }

        result
    }

    pub fn num_points(&self) -> usize {
        self.points
    }

    pub fn num_fields(&self) -> usize {
        self.fields
    }

    pub fn allocate(&mut self, register: Register) {
        *self.registers.get_mut(register) = Channels::new(self.fields, self.points);
        self.allocated[register.slot()] = true;
    }

    pub fn deallocate(&mut self, register: Register) {
        *self.registers.get_mut(register) = Channels::default();
        self.allocated[register.slot()] = false;
    }

    pub fn is_allocated(&self, register: Register) -> bool {
        self.allocated[register.slot()]
    }

    /// Zeroes every allocated register, including ghost cells, along with sources and extras.
    pub fn init(&mut self) {
        for register in Register::ALL {
            if self.is_allocated(register) {
                self.registers.get_mut(register).fill(0.0);
            }
        }
        self.sources.fill(0.0);
        self.extras.fill(0.0);
    }

    pub fn register(&self, register: Register) -> &Channels {
        assert!(self.is_allocated(register), "{register:?} register is not allocated");
        self.registers.get(register)
    }

    pub fn register_mut(&mut self, register: Register) -> &mut Channels {
        assert!(self.is_allocated(register), "{register:?} register is not allocated");
        self.registers.get_mut(register)
    }

    /// Simultaneous access to all registers, for updates that combine several of them.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn sources(&self) -> &Channels {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut Channels {
        &mut self.sources
    }

    pub fn extras(&self) -> &Channels {
        &self.extras
    }

    pub fn extras_mut(&mut self) -> &mut Channels {
        &mut self.extras
    }

    /// Borrows the Active register, sources and extras together with one other register.
    pub fn split_for_update(
        &mut self,
        target: Register,
    ) -> (&Channels, &Channels, &mut Channels, &mut Channels) {
        assert!(target != Register::Active, "cannot update the register being read");
        assert!(self.is_allocated(target), "{target:?} register is not allocated");

        let Registers {
            previous,
            active,
            final_,
            scratch,
            stages,
        } = &mut self.registers;

        let target = match target {
            Register::Previous => previous,
            Register::Final => final_,
            Register::Scratch => scratch,
            Register::Stage(n) => &mut stages[Register::Stage(n).slot() - 4],
            Register::Active => unreachable!(),
        };

        (&*active, &self.sources, target, &mut self.extras)
    }

    pub fn copy_active_to_previous(&mut self) {
        let Registers {
            previous, active, ..
        } = &mut self.registers;
        previous.copy_from(active);
    }

    /// Exchanges the contents of two registers without copying.
    pub fn swap(&mut self, a: Register, b: Register) {
        if a == b {
            return;
        }

        let mut taken = std::mem::take(self.registers.get_mut(a));
        std::mem::swap(&mut taken, self.registers.get_mut(b));
        *self.registers.get_mut(a) = taken;
        self.allocated.swap(a.slot(), b.slot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_are_independent() {
        let mut store = FieldStore::new(3, 10);
        store.register_mut(Register::Active).channel_mut(1)[4] = 2.0;
        store.register_mut(Register::Stage(3)).channel_mut(2)[9] = 5.0;

        assert_eq!(store.register(Register::Previous).channel(1)[4], 0.0);
        store.copy_active_to_previous();
        assert_eq!(store.register(Register::Previous).channel(1)[4], 2.0);

        store.swap(Register::Scratch, Register::Stage(3));
        assert_eq!(store.register(Register::Scratch).channel(2)[9], 5.0);
        assert_eq!(store.register(Register::Stage(3)).channel(2)[9], 0.0);

        store.init();
        assert!(store.register(Register::Scratch).storage().iter().all(|&v| v == 0.0));
        assert!(store.register(Register::Active).storage().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn deallocated_registers_are_released() {
        let mut store = FieldStore::new(2, 4);
        store.deallocate(Register::Scratch);
        assert!(!store.is_allocated(Register::Scratch));
        store.init();
        store.allocate(Register::Scratch);
        assert_eq!(store.register(Register::Scratch).len(), 4);
    }

    #[test]
    #[should_panic]
    fn unallocated_access_panics() {
        let mut store = FieldStore::new(2, 4);
        store.deallocate(Register::Final);
        let _ = store.register(Register::Final);
    }
}
