#![warn(missing_docs)]
/*! A software-defined-radio link layer: bit-exact forward error
correction, interleaving, scrambling, line coding and direct-sequence
spreading for a transmit and receive pipeline pair, plus a frequency-hop
scheduler with three interchangeable sync strategies.

Unlike its ancestor, this crate does not build a streaming block/graph
DSP framework. Callers construct a [`tx::TxPipeline`] from a validated
[`config::LinkConfig`], call [`tx::TxPipeline::submit`] once per
payload, and get back the exact byte stream to put on the air. On the
receive side, [`rx::RxPipeline::push_bit`] is fed one demodulated bit at
a time and yields a [`rx::Frame`] whenever a complete frame passes CRC.

# Example

```
use duskhop::config::LinkConfig;
use duskhop::tx::TxPipeline;
use duskhop::rx::RxPipeline;

let config = LinkConfig::default();
config.validate()?;

let mut tx = TxPipeline::new(&config)?;
let wire = tx.submit(b"hello", 0)?;

let mut rx = RxPipeline::new(&config)?;
let mut frame = None;
for byte in &wire {
    for k in 0..8 {
        let bit = (byte >> (7 - k)) & 1;
        if let Some(f) = rx.push_bit(bit) {
            frame = Some(f);
        }
    }
}
assert_eq!(frame.unwrap().payload, b"hello");
# Ok::<(), duskhop::error::Error>(())
```

# Links

* Upstream this crate descends from: <https://github.com/ThomasHabets/rustradio>
*/

pub mod config;
pub mod crc;
pub mod diagnostics;
pub mod dsss;
pub mod error;
pub mod frame;
pub mod gf;
pub mod hop;
pub mod interleaver;
pub mod manchester;
pub mod nrzi;
pub mod rs;
pub mod rx;
pub mod scrambler;
pub mod tx;
