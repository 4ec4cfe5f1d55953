#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

//! Serial-to-IoT-Hub telemetry bridge
//!
//! Reads 20-field CSV frames from the sensor board on USART3 and publishes
//! each snapshot as JSON to Azure IoT Hub over MQTT/TLS via a W5500.

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod eth;
mod network;
mod serial;
mod status;
mod tls_buffers;

stm32_tim2_monotonic!(Mono, 1_000_000);

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2, UART4])]
mod app {
    use super::*;
    use defmt::{debug, error, info, panic, warn, Debug2Format};
    use embassy_futures::join::join3;
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::rng::Rng;
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use embassy_stm32::usart::{self, UartRx};
    use hub_bridge_core::{LinkState, SasToken, TelemetryState, WallClock};
    use rtic_monotonics::fugit::ExtU64;

    use network::{manager, mqtt, HubSession, NetworkConfig, SessionEnd, SntpClient};
    use status::Activity;
    use tls_buffers::SessionBuffers;

    type Peri<T> = embassy_stm32::Peri<'static, T>;

    struct NetworkPeripherals {
        spi: Peri<peripherals::SPI2>,
        sck: Peri<peripherals::PB13>,
        mosi: Peri<peripherals::PB15>,
        miso: Peri<peripherals::PB14>,
        cs: Peri<peripherals::PC6>,
        reset: Peri<peripherals::PC3>,
        int: Peri<peripherals::PC2>,
        exti: Peri<peripherals::EXTI2>,
        dma_tx: Peri<peripherals::DMA1_CH4>,
        dma_rx: Peri<peripherals::DMA1_CH3>,
    }

    /// Feather TX/RX header pins
    struct SerialPeripherals {
        usart: Peri<peripherals::USART3>,
        rx: Peri<peripherals::PB11>,
        dma_rx: Peri<peripherals::DMA1_CH1>,
    }

    embassy_stm32::bind_interrupts!(struct Irqs {
        RNG => embassy_stm32::rng::InterruptHandler<peripherals::RNG>;
        USART3 => usart::InterruptHandler<peripherals::USART3>;
    });

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("hub-bridge starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / 6 = 2 MHz PLL input, * 168 = 336 MHz VCO
        // VCO / 4 = 84 MHz SYSCLK, VCO / 7 = 48 MHz for the RNG
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);

        // TIM2 on APB1: timer clock = 2 * APB1 = 84 MHz
        Mono::start(84_000_000);

        // Lit until the first hub session is up
        let led = Output::new(p.PC1, Level::High, Speed::Low);

        let serial_periph = SerialPeripherals {
            usart: p.USART3,
            rx: p.PB11,
            dma_rx: p.DMA1_CH1,
        };

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };

        status_task::spawn().ok();
        serial_task::spawn(serial_periph).ok();
        network_task::spawn(net_periph, p.RNG).ok();

        (Shared {}, Local { led })
    }

    #[task(priority = 1, local = [led])]
    async fn status_task(cx: status_task::Context) -> ! {
        status::run(cx.local.led).await
    }

    /// Sensor-board reader; runs independently of the network chain
    #[task(priority = 2)]
    async fn serial_task(_cx: serial_task::Context, periph: SerialPeripherals) -> ! {
        let mut uart_config = usart::Config::default();
        uart_config.baudrate = serial::BAUD_RATE;

        let rx = match UartRx::new(periph.usart, Irqs, periph.rx, periph.dma_rx, uart_config) {
            Ok(rx) => rx,
            Err(e) => panic!("USART3 config rejected: {}", Debug2Format(&e)),
        };
        let Some(rx) = serial::ring_buffered(rx) else {
            panic!("USART3 DMA ring already claimed");
        };
        serial::run(rx).await
    }

    /// Network task - owns the stack, the telemetry record and the hub session
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn network_task(
        _cx: network_task::Context,
        periph: NetworkPeripherals,
        rng_periph: Peri<peripherals::RNG>,
    ) -> ! {
        use embassy_net::{Config, StackResources};
        use static_cell::StaticCell;

        let net_config = NetworkConfig::default();

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let eth_periph = eth::EthPeripherals {
            spi,
            cs: Output::new(periph.cs, Level::High, Speed::VeryHigh),
            reset: Output::new(periph.reset, Level::High, Speed::Low),
            int: ExtiInput::new(periph.int, periph.exti, Pull::Up),
        };
        let (device, w5500_runner) = eth::init_w5500(eth_periph, net_config.mac_addr).await;

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            net_config.seed,
        );
        info!("Network stack initialized with DHCP");

        let agent = run_agent(&stack, rng_periph, &net_config);
        join3(w5500_runner.run(), net_runner.run(), agent).await;
    }

    /// Walk the connection chain forever, restarting it after any failure
    async fn run_agent(
        stack: &embassy_net::Stack<'static>,
        rng_periph: Peri<peripherals::RNG>,
        net_config: &NetworkConfig,
    ) -> ! {
        let hub = network::config::hub_config();
        if let Err(e) = hub.validate() {
            error!(
                "Hub configuration invalid: {} (set HUB_HOST, HUB_DEVICE_ID, HUB_DEVICE_KEY at build time)",
                e
            );
            park().await
        }
        let session = match HubSession::new(hub) {
            Ok(session) => session,
            Err(e) => {
                error!("Cannot build hub names: {}", e);
                park().await
            }
        };
        let Some(mut buffers) = SessionBuffers::take() else {
            error!("Session buffers already claimed");
            park().await
        };

        let mut rng = Rng::new(rng_periph, Irqs);
        let sntp = SntpClient::new();
        let mut telemetry = TelemetryState::new();
        let mut clock = WallClock::new();
        let mut token: Option<SasToken> = None;
        let mut link = LinkState::Disconnected;

        loop {
            debug!("Link state: {}", link);
            link = match link {
                LinkState::Disconnected => {
                    status::report(Activity::Connecting);
                    link.advance()
                }
                LinkState::Associating => {
                    manager::associate(stack).await;
                    link.advance()
                }
                LinkState::TimeSyncing => match sntp.sync(stack).await {
                    Ok(ts) => match clock.calibrate(ts.unix_secs, ts.micros, ts.mono_micros) {
                        Ok(()) => link.advance(),
                        Err(e) => {
                            warn!("SNTP time rejected: {}", e);
                            link.fail()
                        }
                    },
                    Err(e) => {
                        if clock.is_synced() {
                            warn!("Time sync failed: {}; previous calibration kept", e);
                        } else {
                            warn!("Time sync failed: {}", e);
                        }
                        link.fail()
                    }
                },
                LinkState::TokenGenerating => match mqtt::sign_token(&hub, &clock) {
                    Ok(t) => {
                        info!("SAS token signed, expires at {}", t.expires_at());
                        token = Some(t);
                        link.advance()
                    }
                    Err(e) => {
                        error!("Token signing failed: {}", e);
                        link.fail()
                    }
                },
                LinkState::MqttConnecting | LinkState::Connected => match token.as_ref() {
                    None => link.fail(),
                    Some(t) => {
                        let end = session
                            .run(stack, &mut rng, &mut buffers, t, &mut telemetry, &clock)
                            .await;
                        match end {
                            // The session was up; go sign a fresh token
                            Ok(SessionEnd::TokenRefreshDue) => link.advance().refresh_token(),
                            Err(e) => {
                                warn!(
                                    "Hub session ended after message #{}: {}",
                                    telemetry.message_count(),
                                    e
                                );
                                link.fail()
                            }
                        }
                    }
                },
            };

            if link == LinkState::Disconnected {
                Mono::delay(net_config.reconnect_backoff_secs.secs()).await;
            }
        }
    }

    /// Stop the agent for good; the serial reader keeps running for debugging
    async fn park() -> ! {
        loop {
            core::future::pending::<()>().await;
        }
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
