//! Unit tests for the port layer
//!
//! These tests run on the host against the simulated AVR core to verify
//! critical-section nesting, watchdog tick behaviour and tick accounting.

#[cfg(test)]
mod critical_tests {
    use avr_port::cs_cell::CsCell;
    use avr_port::port::SimCpu;
    use avr_port::{critical_section, enter_critical, exit_critical, CriticalSection, Cpu, Sreg};

    fn nest(cpu: &SimCpu, depth: usize) {
        let _cs = enter_critical(cpu);
        assert!(!cpu.interrupts_enabled());
        if depth > 0 {
            nest(cpu, depth - 1);
        }
        assert!(!cpu.interrupts_enabled());
    }

    #[test]
    fn test_nested_enter_exit() {
        let cpu = SimCpu::new();
        cpu.enable_interrupts();

        let outer = enter_critical(&cpu);
        assert!(!cpu.interrupts_enabled());

        let inner = enter_critical(&cpu);
        assert!(!cpu.interrupts_enabled());

        exit_critical(inner);
        assert!(!cpu.interrupts_enabled(), "inner exit must not re-enable");

        exit_critical(outer);
        assert!(cpu.interrupts_enabled());
    }

    #[test]
    fn test_disabled_stays_disabled() {
        let cpu = SimCpu::new();
        assert!(!cpu.interrupts_enabled());

        nest(&cpu, 32);
        assert!(!cpu.interrupts_enabled());
    }

    #[test]
    fn test_deep_nesting_restores_enabled() {
        let cpu = SimCpu::new();
        cpu.enable_interrupts();

        nest(&cpu, 32);
        assert!(cpu.interrupts_enabled());
    }

    #[test]
    fn test_lifo_sequences() {
        for initially_enabled in [false, true] {
            for depth in 1..=8 {
                let cpu = SimCpu::new();
                if initially_enabled {
                    cpu.enable_interrupts();
                }
                let before = cpu.sreg();

                let mut guards: Vec<CriticalSection<'_, SimCpu>> = Vec::new();
                for _ in 0..depth {
                    guards.push(enter_critical(&cpu));
                }
                while let Some(cs) = guards.pop() {
                    exit_critical(cs);
                    if !guards.is_empty() {
                        assert!(!cpu.interrupts_enabled());
                    }
                }

                assert_eq!(cpu.sreg(), before);
            }
        }
    }

    #[test]
    fn test_whole_sreg_restored() {
        let cpu = SimCpu::new();
        cpu.restore(Sreg(0x83));

        let cs = enter_critical(&cpu);
        assert_eq!(cs.saved(), Sreg(0x83));
        assert_eq!(cpu.sreg(), 0x03);
        drop(cs);

        assert_eq!(cpu.sreg(), 0x83);
    }

    #[test]
    fn test_closure_form() {
        let cpu = SimCpu::new();
        cpu.enable_interrupts();

        let shared = CsCell::new(0u8);
        let value = critical_section(&cpu, |cs| {
            assert!(!cpu.interrupts_enabled());
            shared.with(cs, |v| {
                *v += 5;
                *v
            })
        });

        assert_eq!(value, 5);
        assert!(cpu.interrupts_enabled());
        assert_eq!(shared.into_inner(), 5);
    }

    #[test]
    fn test_cell_reentry_refused() {
        let cpu = SimCpu::new();
        let shared = CsCell::new(1u8);

        critical_section(&cpu, |cs| {
            let inner = shared.with(cs, |outer| {
                *outer += 1;
                shared.try_with(cs, |v| *v)
            });
            assert_eq!(inner, None);

            // Borrow is released once the outer access returns
            assert_eq!(shared.try_with(cs, |v| *v), Some(2));
        });
    }

    #[test]
    #[should_panic(expected = "CsCell already borrowed")]
    fn test_cell_nested_with_panics() {
        let cpu = SimCpu::new();
        let shared = CsCell::new(0u8);

        critical_section(&cpu, |cs| {
            shared.with(cs, |_| shared.with(cs, |v| *v));
        });
    }
}

#[cfg(test)]
mod wdt_tests {
    use avr_port::config::{CFG_WDT_OSC_HZ, CFG_WDT_OSC_HZ_CALIBRATED};
    use avr_port::error::PortError;
    use avr_port::port::wdt::{
        configure_tick_raw, control_value, WDE, WDIE, WDIF, WDP3, WDRF,
    };
    use avr_port::port::{SimCpu, WdtEvent};
    use avr_port::{
        configure_tick_interrupt_and_reset, configure_tick_interrupt_only, service_tick, Cpu,
        TickCounter, TickType, WdtMode, WdtTimeout,
    };

    fn service(cpu: &SimCpu, counter: &TickCounter) -> bool {
        cpu.dispatch_watchdog(|cpu| {
            service_tick(cpu, counter, &mut |_: TickType| false);
        })
    }

    #[test]
    fn test_timeout_classes() {
        for (raw, timeout) in WdtTimeout::ALL.iter().enumerate() {
            assert_eq!(WdtTimeout::try_from(raw as u8), Ok(*timeout));
            assert_eq!(timeout.period_ms(), 16u16 << raw);
        }
        assert_eq!(WdtTimeout::try_from(10), Err(PortError::InvalidTimeout));
        assert_eq!(WdtTimeout::try_from(0xFF), Err(PortError::InvalidTimeout));
    }

    #[test]
    fn test_periods() {
        assert_eq!(WdtTimeout::Ms15.period_us(CFG_WDT_OSC_HZ), Some(16_000));
        assert_eq!(WdtTimeout::Ms15.period_us(CFG_WDT_OSC_HZ_CALIBRATED), Some(17_066));
        assert_eq!(WdtTimeout::Ms15.period_us(0), None);
        assert_eq!(WdtTimeout::Ms15.period_us_nominal(), 16_000);
        assert_eq!(WdtTimeout::Ms15.period_us_calibrated(), 17_066);
        assert_eq!(WdtTimeout::S8.period_us_nominal(), 8_192_000);
        assert_eq!(WdtTimeout::Ms15.tick_rate_hz(), 62);
        assert_eq!(WdtTimeout::S2.tick_rate_hz(), 0);
    }

    #[test]
    fn test_interrupt_only_registers() {
        let cpu = SimCpu::new();
        configure_tick_interrupt_only(&cpu, WdtTimeout::Ms15);

        assert_eq!(cpu.watchdog_control(), WDIE);
        assert_eq!(cpu.wdr_count(), 1);
        assert!(!cpu.interrupts_enabled());
    }

    #[test]
    fn test_interrupt_and_reset_registers() {
        let cpu = SimCpu::new();
        configure_tick_interrupt_and_reset(&cpu, WdtTimeout::S8);

        assert_eq!(cpu.watchdog_control(), WDIE | WDE | WDP3 | 0x01);
    }

    #[test]
    fn test_configure_restores_interrupt_state() {
        let cpu = SimCpu::new();
        cpu.enable_interrupts();
        configure_tick_interrupt_only(&cpu, WdtTimeout::Ms60);
        assert!(cpu.interrupts_enabled());

        cpu.disable_interrupts();
        configure_tick_interrupt_and_reset(&cpu, WdtTimeout::Ms60);
        assert!(!cpu.interrupts_enabled());
    }

    #[test]
    fn test_configure_clears_stale_interrupt() {
        let cpu = SimCpu::new();
        configure_tick_interrupt_only(&cpu, WdtTimeout::Ms15);
        assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
        assert!(cpu.watchdog_pending());

        configure_tick_interrupt_only(&cpu, WdtTimeout::Ms30);
        assert!(!cpu.watchdog_pending());
        assert_eq!(cpu.watchdog_control() & WDIF, 0);
    }

    #[test]
    fn test_stopped_watchdog() {
        let cpu = SimCpu::new();
        assert_eq!(cpu.expire_watchdog(), WdtEvent::Stopped);
    }

    #[test]
    fn test_interrupt_only_never_resets() {
        let cpu = SimCpu::new();
        configure_tick_interrupt_only(&cpu, WdtTimeout::Ms15);

        for _ in 0..100 {
            assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
        }
        assert_eq!(cpu.resets(), 0);
    }

    #[test]
    fn test_two_missed_periods_reset() {
        let cpu = SimCpu::new();
        configure_tick_interrupt_and_reset(&cpu, WdtTimeout::Ms15);

        assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
        assert_eq!(cpu.expire_watchdog(), WdtEvent::Reset);
        assert_eq!(cpu.resets(), 1);
        assert_ne!(cpu.mcusr() & WDRF, 0);
        assert!(!cpu.interrupts_enabled());
    }

    #[test]
    fn test_serviced_periods_never_reset() {
        let cpu = SimCpu::new();
        let counter = TickCounter::new();
        configure_tick_interrupt_and_reset(&cpu, WdtTimeout::Ms15);
        cpu.enable_interrupts();

        for _ in 0..50 {
            assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
            assert!(service(&cpu, &counter));
        }
        assert_eq!(cpu.resets(), 0);
        assert_eq!(counter.get(), 50);
    }

    #[test]
    fn test_late_service_prevents_reset() {
        let cpu = SimCpu::new();
        let counter = TickCounter::new();
        configure_tick_interrupt_and_reset(&cpu, WdtTimeout::Ms15);

        // Masked when the period ends, serviced before the next one
        assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
        assert!(!service(&cpu, &counter));
        cpu.enable_interrupts();
        assert!(service(&cpu, &counter));

        assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
        assert_eq!(cpu.resets(), 0);
    }

    #[test]
    fn test_rearm_keeps_pending_expiry() {
        let cpu = SimCpu::new();
        configure_tick_interrupt_and_reset(&cpu, WdtTimeout::Ms15);

        assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
        assert_eq!(cpu.watchdog_control() & WDIE, 0);

        // Re-arming must not acknowledge the expiry it races with
        cpu.watchdog_rearm();
        assert!(cpu.watchdog_pending());
        assert_ne!(cpu.watchdog_control() & WDIE, 0);
        assert_ne!(cpu.watchdog_control() & WDE, 0);
    }

    #[test]
    fn test_reconfigure_after_watchdog_reset() {
        let cpu = SimCpu::new();
        configure_tick_interrupt_and_reset(&cpu, WdtTimeout::Ms15);
        cpu.expire_watchdog();
        assert_eq!(cpu.expire_watchdog(), WdtEvent::Reset);

        // Still in reset mode until software takes over
        assert_eq!(cpu.expire_watchdog(), WdtEvent::Reset);

        configure_tick_interrupt_only(&cpu, WdtTimeout::Ms15);
        assert_eq!(cpu.mcusr() & WDRF, 0);
        for _ in 0..10 {
            assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
        }
        assert_eq!(cpu.resets(), 2);
    }

    #[test]
    fn test_raw_configuration() {
        let cpu = SimCpu::new();

        assert_eq!(
            configure_tick_raw(&cpu, 12, WdtMode::Interrupt),
            Err(PortError::InvalidTimeout)
        );
        assert_eq!(cpu.watchdog_control(), 0);
        assert_eq!(cpu.wdr_count(), 0);

        assert_eq!(
            configure_tick_raw(&cpu, 8, WdtMode::Interrupt),
            Ok(WdtTimeout::S4)
        );
        assert_eq!(
            cpu.watchdog_control(),
            control_value(WdtTimeout::S4, WdtMode::Interrupt) & !WDIF
        );
    }
}

#[cfg(test)]
mod tick_tests {
    use avr_port::port::wdt::WDIF;
    use avr_port::port::{SimCpu, WdtEvent};
    use avr_port::time::{ms_to_ticks, ticks_to_ms};
    use avr_port::{
        configure_tick_interrupt_only, critical_section, service_tick, start_tick, Cpu,
        TickCounter, TickType, WdtTimeout, MAX_DELAY,
    };

    #[test]
    fn test_one_increment_per_service() {
        let cpu = SimCpu::new();
        let counter = TickCounter::new();
        let mut seen: Vec<TickType> = Vec::new();

        for _ in 0..3 {
            service_tick(&cpu, &counter, &mut |now: TickType| {
                seen.push(now);
                false
            });
        }

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(counter.get(), 3);
        assert_eq!(cpu.yields(), 0);
    }

    #[test]
    fn test_wraps_silently() {
        let cpu = SimCpu::new();
        let counter = TickCounter::with_initial(MAX_DELAY - 1);

        service_tick(&cpu, &counter, &mut |_: TickType| false);
        assert_eq!(counter.get(), MAX_DELAY);

        service_tick(&cpu, &counter, &mut |_: TickType| false);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_hook_requests_switch() {
        let cpu = SimCpu::new();
        let counter = TickCounter::new();
        let mut every_other = |now: TickType| now % 2 == 0;

        assert!(!service_tick(&cpu, &counter, &mut every_other));
        assert!(service_tick(&cpu, &counter, &mut every_other));
        assert!(!service_tick(&cpu, &counter, &mut every_other));
        assert_eq!(cpu.yields(), 1);
    }

    #[test]
    fn test_boot_to_thousand_ticks() {
        let cpu = SimCpu::new();
        let counter = TickCounter::new();

        configure_tick_interrupt_only(&cpu, WdtTimeout::ALL[0]);
        cpu.enable_interrupts();

        for _ in 0..1000 {
            assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
            let serviced = cpu.dispatch_watchdog(|cpu| {
                service_tick(cpu, &counter, &mut |_: TickType| false);
            });
            assert!(serviced);
        }

        let expected = (1000u64 % (MAX_DELAY as u64 + 1)) as TickType;
        assert_eq!(counter.get(), expected);
        assert_eq!(cpu.resets(), 0);
        assert!(cpu.interrupts_enabled());
    }

    #[test]
    fn test_tick_held_off_by_critical_section() {
        let cpu = SimCpu::new();
        let counter = TickCounter::new();
        configure_tick_interrupt_only(&cpu, WdtTimeout::Ms15);
        cpu.enable_interrupts();

        critical_section(&cpu, |_cs| {
            assert_eq!(cpu.expire_watchdog(), WdtEvent::Interrupt);
            let serviced = cpu.dispatch_watchdog(|cpu| {
                service_tick(cpu, &counter, &mut |_: TickType| false);
            });
            assert!(!serviced);
            assert_eq!(counter.get(), 0);
        });

        assert!(cpu.dispatch_watchdog(|cpu| {
            service_tick(cpu, &counter, &mut |_: TickType| false);
        }));
        assert_eq!(counter.get(), 1);
        assert_eq!(cpu.watchdog_control() & WDIF, 0);
    }

    #[test]
    fn test_start_tick_uses_config() {
        use avr_port::config::{CFG_TICK_MODE, CFG_TICK_TIMEOUT};
        use avr_port::port::wdt::control_value;

        let cpu = SimCpu::new();
        start_tick(&cpu);

        assert_eq!(
            cpu.watchdog_control(),
            control_value(CFG_TICK_TIMEOUT, CFG_TICK_MODE) & !WDIF
        );
    }

    #[test]
    fn test_configured_conversions() {
        use avr_port::config::CFG_TICK_TIMEOUT;

        let period = CFG_TICK_TIMEOUT.period_ms() as u32;
        assert_eq!(ms_to_ticks(period * 10), 10);
        assert_eq!(ticks_to_ms(10), period as u64 * 10);
    }
}

#[cfg(test)]
mod port_tests {
    use avr_port::port::{disable_interrupts, enable_interrupts, nop, SimCpu};
    use avr_port::{
        reset_sleep_configuration, service_tick, tick_reached, ticks_elapsed, yield_now, Cpu,
        StackType, TaskFunction, TickCounter, TickType, BYTE_ALIGNMENT, MAX_DELAY, STACK_GROWTH,
    };

    avr_port::task_function!(fn idle_task(params) {
        assert!(params.is_null());
    });

    #[test]
    fn test_port_constants() {
        assert_eq!(STACK_GROWTH, -1);
        assert_eq!(BYTE_ALIGNMENT, 1);
        assert_eq!(core::mem::size_of::<StackType>(), 1);
        assert_eq!(MAX_DELAY, TickType::MAX);
    }

    #[test]
    fn test_sleep_reset_idempotent() {
        let cpu = SimCpu::new();
        // Power-down selected with sleep enable
        cpu.write_sleep_control(0b0000_0101);

        reset_sleep_configuration(&cpu);
        let once = cpu.sleep_control();
        reset_sleep_configuration(&cpu);

        assert_eq!(once, 0);
        assert_eq!(cpu.sleep_control(), once);
    }

    #[test]
    fn test_yield_hands_off() {
        let cpu = SimCpu::new();
        yield_now(&cpu);
        yield_now(&cpu);
        assert_eq!(cpu.yields(), 2);
    }

    #[test]
    fn test_tick_switch_yields() {
        let cpu = SimCpu::new();
        let counter = TickCounter::new();

        assert!(service_tick(&cpu, &counter, &mut |_: TickType| true));
        assert_eq!(cpu.yields(), 1);
    }

    #[test]
    fn test_raw_interrupt_control() {
        let cpu = SimCpu::new();
        enable_interrupts(&cpu);
        assert!(cpu.interrupts_enabled());
        disable_interrupts(&cpu);
        assert!(!cpu.interrupts_enabled());
        nop(&cpu);
        assert_eq!(cpu.nops(), 1);
    }

    #[test]
    fn test_modular_tick_comparison() {
        let start = MAX_DELAY - 5;
        let now = start.wrapping_add(10);
        assert_eq!(ticks_elapsed(now, start), 10);
        assert!(tick_reached(now, start.wrapping_add(8)));
        assert!(!tick_reached(start, now));
    }

    #[test]
    fn test_task_function_macro() {
        let entry: TaskFunction = idle_task;
        entry(core::ptr::null_mut());
    }
}
