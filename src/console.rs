//! The whole console: CPU on the address space, the GPU, and the controller.
//!
//! One [`Console::step`] executes one instruction and then services a pending GPU
//! refresh, in that order; nothing overlaps.

use log::{debug, info};

use crate::{
    bus::AddressSpace,
    cartridge::cartridge::Cartridge,
    controller::Controller,
    cpu::cpu::{Cpu, CpuState},
    error::Result,
    gpu::gpu::Gpu,
};

pub const DEFAULT_FPS: u8 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Running,
    /// A refresh was serviced; the framebuffer holds a new picture.
    FrameReady,
    /// The CPU is halted and waits for [`Console::acknowledge`].
    Halted,
}

pub struct Console {
    pub cpu: Cpu<AddressSpace>,
    pub gpu: Gpu,
    pub controller: Controller,
}

impl Console {
    /// Power on: map the cartridge, lay out the background grid, start at the entrypoint.
    pub fn new(cart: Cartridge) -> Self {
        let entrypoint = cart.header.entrypoint;
        let mut bus = AddressSpace::new(cart);
        bus.seed_background_layout();

        let mut cpu = Cpu::new(bus);
        cpu.reset(entrypoint);
        info!("power on, PC=${entrypoint:04X}");

        Self {
            cpu,
            gpu: Gpu::new(),
            controller: Controller::new(),
        }
    }

    pub fn step(&mut self) -> Result<Event> {
        if self.cpu.step()? == CpuState::Halted {
            return Ok(Event::Halted);
        }

        let bus = &mut self.cpu.bus;
        if !bus.refresh_requested() {
            return Ok(Event::Running);
        }
        bus.clear_refresh();
        self.gpu.refresh(&*bus)?;
        bus.set_input(self.controller.snapshot());
        debug!("refresh serviced at PC=${:04X}", self.cpu.pc);
        Ok(Event::FrameReady)
    }

    /// Step until a frame is ready, the CPU halts, or `max_steps` instructions have run.
    pub fn run_frame(&mut self, max_steps: usize) -> Result<Event> {
        for _ in 0..max_steps {
            match self.step()? {
                Event::Running => {}
                event => return Ok(event),
            }
        }
        Ok(Event::Running)
    }

    /// Operator acknowledgement of a halt.
    pub fn acknowledge(&mut self) {
        if self.cpu.is_halted() {
            info!("halt acknowledged at PC=${:04X}", self.cpu.pc);
            self.cpu.acknowledge();
        }
    }

    /// Header frame rate, or 60 when the header leaves it at zero.
    pub fn target_fps(&self) -> u8 {
        match self.cpu.bus.cart.header.target_fps {
            0 => DEFAULT_FPS,
            fps => fps,
        }
    }

    pub fn title(&self) -> String {
        self.cpu.bus.cart.header.name()
    }
}
