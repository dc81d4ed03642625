//! Pins the opcode table. Any edit to a name, byte value, mnemonic, arity
//! or immediate width changes the fingerprint and fails the check.

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;
const EXPECTED_ISA_HASH: u64 = 10939585380947458635;

fn fnv1a64(mut h: u64, bytes: &[u8]) -> u64 {
    for b in bytes {
        h ^= *b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

macro_rules! hash_isa {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [$pops:literal, $pushes:literal] $(+ $imm:literal)?
        ),* $(,)?
    ) => {{
        let mut h = FNV_OFFSET;
        $(
            h = fnv1a64(h, stringify!($name).as_bytes());
            h = fnv1a64(h, &[crate::evm::isa::OpCode::$name as u8]);
            h = fnv1a64(h, $mnemonic.as_bytes());
            h = fnv1a64(h, &($pops as u64).to_le_bytes());
            h = fnv1a64(h, &($pushes as u64).to_le_bytes());
            h = fnv1a64(h, &((0 $( + $imm )?) as u64).to_le_bytes());
        )*
        h
    }};
}

fn current_isa_hash() -> u64 {
    crate::for_each_opcode!(hash_isa)
}

#[test]
#[ignore]
fn print_isa_hash() {
    println!("ISA_HASH={}", current_isa_hash());
}

#[test]
fn isa_hash_unchanged() {
    assert_eq!(current_isa_hash(), EXPECTED_ISA_HASH);
}
