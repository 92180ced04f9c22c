#![cfg_attr(target_arch = "bpf", no_std)]
#![cfg_attr(target_arch = "bpf", no_main)]

// Kernel-resident rendition of the capture hook. Builds only for the bpf
// target; host builds get a stub so the workspace compiles without a BPF
// toolchain.
#[cfg(not(target_arch = "bpf"))]
fn main() {}

#[cfg(target_arch = "bpf")]
use aya_ebpf::{
    bindings::xdp_action,
    helpers::bpf_ktime_get_ns,
    macros::{map, xdp},
    maps::{Array, PerCpuArray, RingBuf},
    programs::XdpContext,
};
#[cfg(target_arch = "bpf")]
use frametap_common::{PacketEvent, SNAP_CAP};

/// Ring channel to userspace. 2 MiB holds roughly 7700 events.
#[cfg(target_arch = "bpf")]
#[map(name = "EVENTS")]
static EVENTS: RingBuf = RingBuf::with_byte_size(1 << 21, 0);

/// Events lost to a full ring, per CPU.
#[cfg(target_arch = "bpf")]
#[map(name = "DROPS")]
static DROPS: PerCpuArray<u64> = PerCpuArray::with_max_entries(1, 0);

/// Capture percentage (0-100), written from userspace. Slot 0.
#[cfg(target_arch = "bpf")]
#[map(name = "SAMPLE_RATE")]
static SAMPLE_RATE: Array<u32> = Array::with_max_entries(1, 0);

/// Per-CPU sampling credit; a frame is captured when it crosses 100.
#[cfg(target_arch = "bpf")]
#[map(name = "CREDIT")]
static CREDIT: PerCpuArray<u32> = PerCpuArray::with_max_entries(1, 0);

#[cfg(target_arch = "bpf")]
#[xdp]
pub fn frametap(ctx: XdpContext) -> u32 {
    match try_capture(&ctx) {
        Ok(ret) => ret,
        Err(_) => xdp_action::XDP_PASS,
    }
}

#[cfg(target_arch = "bpf")]
fn try_capture(ctx: &XdpContext) -> Result<u32, ()> {
    // Capture is observe-only: whatever happens below, the frame passes.
    if !sample(ctx) {
        return Ok(xdp_action::XDP_PASS);
    }

    let start = ctx.data();
    let end = ctx.data_end();
    let wire_len = end.saturating_sub(start);

    match EVENTS.reserve::<PacketEvent>(0) {
        Some(mut slot) => {
            let mut event = PacketEvent::empty();
            event.timestamp_ns = unsafe { bpf_ktime_get_ns() };
            event.packet_len = wire_len as u32;

            let mut copied = 0;
            while copied < SNAP_CAP {
                let src = start + copied;
                if src >= end {
                    break;
                }
                event.payload[copied] = unsafe { *(src as *const u8) };
                copied += 1;
            }
            event.cap_len = copied as u32;

            slot.write(event);
            slot.submit(0);
        }
        None => {
            if let Some(drops) = DROPS.get_ptr_mut(0) {
                unsafe { *drops += 1 };
            }
        }
    }

    Ok(xdp_action::XDP_PASS)
}

/// Deterministic counter-based sampler; no RNG on the packet path.
#[cfg(target_arch = "bpf")]
fn sample(_ctx: &XdpContext) -> bool {
    let rate = match SAMPLE_RATE.get(0) {
        Some(rate) => (*rate).min(100),
        None => 100,
    };

    let Some(credit) = CREDIT.get_ptr_mut(0) else {
        return true;
    };

    unsafe {
        *credit += rate;
        if *credit < 100 {
            return false;
        }
        *credit -= 100;
    }
    true
}

#[cfg(target_arch = "bpf")]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {
        core::hint::spin_loop();
    }
}
