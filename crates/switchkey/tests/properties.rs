use proptest::collection::vec as prop_vec;
use proptest::prelude::*;
use std::error::Error;
use std::sync::Arc;
use std::thread;
use switchkey::{
    switch_key, Error as SwitchKeyError, KeySwitchKeyMaterial, ModSwitchFactorTable,
    ModulusTable, ParametersError, SwitchKeyKernel, SwitchKeyParametersBuilder,
};

const BASIS: [u64; 4] = [257, 97, 193, 113];
const N: usize = 8;
const MAX_DECOMP: usize = 3;
const MAX_COMPONENTS: usize = 2;

struct Instance {
    kernel: SwitchKeyKernel,
    factors: ModSwitchFactorTable,
    buffer: Vec<u64>,
    target_tier: Vec<u64>,
    key: KeySwitchKeyMaterial,
}

/// Build a reduced instance with `d` decomposition moduli and `components`
/// key components from raw random words.
fn instance(
    d: usize,
    components: usize,
    raw_buffer: &[u64],
    raw_target: &[u64],
    raw_key: &[u64],
) -> Instance {
    let basis = [&BASIS[..d], &BASIS[3..]].concat();
    let moduli = ModulusTable::new(&basis).unwrap();
    let par = SwitchKeyParametersBuilder::new()
        .set_coeff_count(N)
        .set_decomp_modulus_size(d)
        .set_key_modulus_size(d + 1)
        .set_key_component_count(components)
        .build()
        .unwrap();
    let layout = par.layout();

    let reduce = |raw: &[u64], rows: usize| {
        raw.iter()
            .enumerate()
            .map(|(idx, v)| v % basis[(idx / N) % rows])
            .collect::<Vec<_>>()
    };
    let mut buffer = reduce(&raw_buffer[..layout.switched_len()], d);
    buffer.extend_from_slice(&raw_buffer[layout.switched_len()..layout.buffer_len()]);
    let target_tier = reduce(&raw_target[..par.target_tier_len()], d);
    let key_vectors = raw_key
        .chunks_exact(par.key_vector_len())
        .take(d)
        .map(|chunk| reduce(chunk, d + 1))
        .collect::<Vec<_>>();
    let key = KeySwitchKeyMaterial::new(&key_vectors, components, d + 1, N).unwrap();

    Instance {
        factors: ModSwitchFactorTable::from_moduli(&moduli, d).unwrap(),
        kernel: SwitchKeyKernel::new(&par, moduli).unwrap(),
        buffer,
        target_tier,
        key,
    }
}

fn raw_inputs() -> impl Strategy<Value = (usize, usize, Vec<u64>, Vec<u64>, Vec<u64>)> {
    (
        1..=MAX_DECOMP,
        1..=MAX_COMPONENTS,
        prop_vec(any::<u64>(), (MAX_COMPONENTS + 1) * MAX_DECOMP * N),
        prop_vec(any::<u64>(), MAX_DECOMP * N),
        prop_vec(any::<u64>(), MAX_DECOMP * MAX_COMPONENTS * (MAX_DECOMP + 1) * N),
    )
}

proptest! {
    #[test]
    fn deterministic((d, components, raw_buffer, raw_target, raw_key) in raw_inputs()) {
        let inst = instance(d, components, &raw_buffer, &raw_target, &raw_key);
        let mut first = inst.buffer.clone();
        let mut second = inst.buffer.clone();
        inst.kernel.switch_key(&mut first, &inst.target_tier, &inst.key, &inst.factors).unwrap();
        inst.kernel.switch_key(&mut second, &inst.target_tier, &inst.key, &inst.factors).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn tail_is_target_tier((d, components, raw_buffer, raw_target, raw_key) in raw_inputs(), fill in any::<u64>()) {
        let inst = instance(d, components, &raw_buffer, &raw_target, &raw_key);
        let switched_len = inst.kernel.parameters().layout().switched_len();

        let mut out = inst.buffer.clone();
        inst.kernel.switch_key(&mut out, &inst.target_tier, &inst.key, &inst.factors).unwrap();
        prop_assert_eq!(&out[switched_len..], &inst.target_tier[..]);

        // The incoming tail is never read.
        let mut other = inst.buffer.clone();
        other[switched_len..].fill(fill);
        inst.kernel.switch_key(&mut other, &inst.target_tier, &inst.key, &inst.factors).unwrap();
        prop_assert_eq!(other, out);
    }

    #[test]
    fn outputs_are_reduced((d, components, raw_buffer, raw_target, raw_key) in raw_inputs()) {
        let inst = instance(d, components, &raw_buffer, &raw_target, &raw_key);
        let layout = inst.kernel.parameters().layout();
        let mut out = inst.buffer.clone();
        inst.kernel.switch_key(&mut out, &inst.target_tier, &inst.key, &inst.factors).unwrap();

        let (switched, _) = layout.split(&out).unwrap();
        for ((_, i, _), v) in switched.indexed_iter() {
            prop_assert!(*v < inst.kernel.moduli().modulus(i).value());
        }
    }

    #[test]
    fn accumulates_into_buffer((d, components, raw_buffer, raw_target, raw_key) in raw_inputs()) {
        let inst = instance(d, components, &raw_buffer, &raw_target, &raw_key);
        let layout = inst.kernel.parameters().layout();

        let mut out = inst.buffer.clone();
        inst.kernel.switch_key(&mut out, &inst.target_tier, &inst.key, &inst.factors).unwrap();
        let mut from_zero = vec![0u64; layout.buffer_len()];
        inst.kernel.switch_key(&mut from_zero, &inst.target_tier, &inst.key, &inst.factors).unwrap();

        let (switched, _) = layout.split(&out).unwrap();
        let (switched_zero, _) = layout.split(&from_zero).unwrap();
        let (initial, _) = layout.split(&inst.buffer).unwrap();
        for ((c, i, k), v) in switched.indexed_iter() {
            let q = inst.kernel.moduli().modulus(i);
            prop_assert_eq!(*v, q.add(switched_zero[[c, i, k]], initial[[c, i, k]]));
        }
    }

    #[test]
    fn zero_key_leaves_switched_region((d, components, raw_buffer, raw_target, _raw_key) in raw_inputs()) {
        let zero_key = vec![0u64; MAX_DECOMP * MAX_COMPONENTS * (MAX_DECOMP + 1) * N];
        let inst = instance(d, components, &raw_buffer, &raw_target, &zero_key);
        let switched_len = inst.kernel.parameters().layout().switched_len();

        let mut out = inst.buffer.clone();
        inst.kernel.switch_key(&mut out, &inst.target_tier, &inst.key, &inst.factors).unwrap();
        prop_assert_eq!(&out[..switched_len], &inst.buffer[..switched_len]);
    }
}

#[test]
fn shared_between_threads() -> Result<(), Box<dyn Error>> {
    let raw = (0..1024u64).map(|i| i.wrapping_mul(0x9e37_79b9_7f4a_7c15)).collect::<Vec<_>>();
    let inst = instance(3, 2, &raw[..96], &raw[96..120], &raw[120..504]);
    let kernel = Arc::new(inst.kernel);

    let mut expected = inst.buffer.clone();
    kernel.switch_key(&mut expected, &inst.target_tier, &inst.key, &inst.factors)?;

    let mut buffers = vec![inst.buffer.clone(); 4];
    thread::scope(|scope| {
        for buffer in buffers.iter_mut() {
            let kernel = Arc::clone(&kernel);
            let (target_tier, key, factors) = (&inst.target_tier, &inst.key, &inst.factors);
            scope.spawn(move || kernel.switch_key(buffer, target_tier, key, factors).unwrap());
        }
    });
    for buffer in buffers {
        assert_eq!(buffer, expected);
    }
    Ok(())
}

/// Flat inputs of the canonical shape: n = 16, two decomposition moduli, three
/// key moduli, two components.
struct FlatInputs {
    buffer: Vec<u64>,
    target_tier: Vec<u64>,
    coeff_count: usize,
    decomp_modulus_size: usize,
    key_modulus_size: usize,
    rns_modulus_size: usize,
    key_component_count: usize,
    moduli: Vec<u64>,
    key_vectors: Vec<Vec<u64>>,
    factors: Vec<u64>,
}

impl FlatInputs {
    fn canonical() -> Self {
        Self {
            buffer: (0..96).collect(),
            target_tier: (0..32).collect(),
            coeff_count: 16,
            decomp_modulus_size: 2,
            key_modulus_size: 3,
            rns_modulus_size: 3,
            key_component_count: 2,
            moduli: vec![
                1152921504606844417,
                1152921504606844513,
                1152921504606845473,
            ],
            key_vectors: vec![vec![1; 96], vec![2; 96]],
            factors: vec![1047018677005647534, 1036428394245527932],
        }
    }

    fn run(&mut self) -> switchkey::Result<()> {
        let key_vectors = self
            .key_vectors
            .iter()
            .map(|v| v.as_slice())
            .collect::<Vec<_>>();
        switch_key(
            &mut self.buffer,
            &self.target_tier,
            self.coeff_count,
            self.decomp_modulus_size,
            self.key_modulus_size,
            self.rns_modulus_size,
            self.key_component_count,
            &self.moduli,
            &key_vectors,
            &self.factors,
        )
    }
}

fn check_rejected(perturb: impl FnOnce(&mut FlatInputs), expected: SwitchKeyError) {
    let mut inputs = FlatInputs::canonical();
    perturb(&mut inputs);
    let before = inputs.buffer.clone();
    assert_eq!(inputs.run(), Err(expected));
    assert_eq!(inputs.buffer, before);
}

fn mismatch(what: &'static str, found: usize, expected: usize) -> SwitchKeyError {
    SwitchKeyError::DimensionMismatch {
        what,
        found,
        expected,
    }
}

#[test]
fn invalid_dimensions_leave_buffer_untouched() {
    let mut inputs = FlatInputs::canonical();
    assert!(inputs.run().is_ok());

    check_rejected(
        |f| {
            f.buffer.pop();
        },
        mismatch("buffer", 95, 96),
    );
    check_rejected(|f| f.buffer.push(0), mismatch("buffer", 97, 96));
    check_rejected(
        |f| {
            f.target_tier.pop();
        },
        mismatch("target tier", 31, 32),
    );
    check_rejected(
        |f| {
            f.key_vectors.pop();
        },
        mismatch("key vectors", 1, 2),
    );
    check_rejected(
        |f| {
            f.key_vectors[1].pop();
        },
        mismatch("key vector", 95, 96),
    );
    check_rejected(
        |f| {
            f.factors.pop();
        },
        mismatch("mod-switch factors", 1, 2),
    );
    check_rejected(
        |f| {
            f.moduli.pop();
        },
        mismatch("moduli", 2, 3),
    );
    check_rejected(
        |f| f.rns_modulus_size = 2,
        SwitchKeyError::ParametersError(ParametersError::ModulusCountMismatch(2, 3)),
    );
    for decomp in [0, 3] {
        check_rejected(
            |f| f.decomp_modulus_size = decomp,
            SwitchKeyError::ParametersError(ParametersError::InvalidDecompositionSize(decomp, 2)),
        );
    }
    check_rejected(
        |f| f.key_component_count = 0,
        SwitchKeyError::ParametersError(ParametersError::InvalidComponentCount(0)),
    );
    // With three components, the target tier still holds one row per
    // decomposition modulus.
    check_rejected(
        |f| {
            f.key_component_count = 3;
            f.buffer = (0..128).collect();
            f.target_tier = (0..48).collect();
            f.key_vectors = vec![vec![1; 144], vec![2; 144]];
        },
        mismatch("target tier", 48, 32),
    );
    check_rejected(
        |f| f.coeff_count = 12,
        SwitchKeyError::ParametersError(ParametersError::InvalidDegree(12)),
    );
    // The first modulus supports the NTT up to size 256, the second one only
    // up to size 16.
    check_rejected(
        |f| f.coeff_count = 32,
        SwitchKeyError::ParametersError(ParametersError::UnsupportedModulus(
            1152921504606844513,
            32,
        )),
    );
    check_rejected(
        |f| f.coeff_count = 512,
        SwitchKeyError::ParametersError(ParametersError::UnsupportedModulus(
            1152921504606844417,
            512,
        )),
    );
}

#[test]
fn mismatched_key_material() -> Result<(), Box<dyn Error>> {
    let moduli = ModulusTable::new(&[97, 193, 257])?;
    let par = SwitchKeyParametersBuilder::new()
        .set_coeff_count(16)
        .set_decomp_modulus_size(2)
        .set_key_modulus_size(3)
        .build()?;
    let factors = ModSwitchFactorTable::from_moduli(&moduli, 2)?;
    let kernel = SwitchKeyKernel::new(&par, moduli)?;
    let target_tier = vec![0u64; 32];

    for (key, what, found, expected) in [
        (KeySwitchKeyMaterial::new(&[vec![0; 48], vec![0; 48]], 1, 3, 16)?, "key components", 1, 2),
        (KeySwitchKeyMaterial::new(&[vec![0; 64], vec![0; 64]], 2, 2, 16)?, "key moduli", 2, 3),
        (KeySwitchKeyMaterial::new(&[vec![0; 48], vec![0; 48]], 2, 3, 8)?, "key coefficients", 8, 16),
        (KeySwitchKeyMaterial::new(&[vec![0; 96]], 2, 3, 16)?, "key vectors", 1, 2),
    ] {
        let mut buffer = vec![5u64; 96];
        assert_eq!(
            kernel.switch_key(&mut buffer, &target_tier, &key, &factors),
            Err(SwitchKeyError::DimensionMismatch {
                what,
                found,
                expected
            })
        );
        assert_eq!(buffer, vec![5u64; 96]);
    }
    Ok(())
}
