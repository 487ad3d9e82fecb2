//! Frame manager and transaction entry point
//!
//! [`Evm`] owns the journaled state for one transaction at a time. It
//! implements [`Host`] so the interpreter can reach state, and drives call
//! and create frames on an explicit frame stack. Every frame runs inside its
//! own checkpoint, committed on success and reverted otherwise.

use crate::analysis::{CodeCache, JumpDests};
use crate::config::{EvmConfig, Hardfork};
use crate::context::{Environment, FrameContext};
use crate::error::{EvmError, EvmResult};
use crate::gas::{self, Gas};
use crate::host::{
    AccountLoad, CallInputs, CallScheme, CallValue, CreateInputs, CreateScheme, Host,
    SStoreResult, SelfDestructResult, StateLoad,
};
use crate::interpreter::{Interpreter, InterpreterAction, InterpreterResult};
use crate::precompiles::{Precompile, Precompiles};
use crate::result::{decode_revert_reason, CallResult, ExitReason, FrameResult};
use bach_crypto::keccak256;
use bach_primitives::{Address, H256, U256};
use bach_state::{Checkpoint, JournaledState, Log, StateReader, StateWriter};
use bytes::Bytes;
use rlp::RlpStream;
use std::sync::Arc;

/// What a transaction does
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxKind {
    /// Message call
    Call(Address),
    /// Read-only call
    StaticCall(Address),
    /// Run the target's code in the caller's own context
    DelegateCall(Address),
    /// Contract creation, address from the caller's nonce
    Create,
    /// Contract creation, address from a salt
    Create2 {
        /// Salt word
        salt: U256,
    },
}

/// Pre-warmed account and slots (EIP-2930)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessListItem {
    /// Account
    pub address: Address,
    /// Slots of `address`
    pub storage_keys: Vec<U256>,
}

/// A transaction as seen by the execution core
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Sender
    pub caller: Address,
    /// Call or create
    pub kind: TxKind,
    /// Value sent
    pub value: U256,
    /// Call data or init code
    pub data: Bytes,
    /// Gas limit
    pub gas_limit: u64,
    /// Access list
    pub access_list: Vec<AccessListItem>,
}

impl Transaction {
    /// Plain message call
    pub fn call(caller: Address, to: Address, value: U256, data: Bytes, gas_limit: u64) -> Self {
        Self {
            caller,
            kind: TxKind::Call(to),
            value,
            data,
            gas_limit,
            access_list: Vec::new(),
        }
    }

    /// Contract creation
    pub fn create(caller: Address, value: U256, init_code: Bytes, gas_limit: u64) -> Self {
        Self {
            caller,
            kind: TxKind::Create,
            value,
            data: init_code,
            gas_limit,
            access_list: Vec::new(),
        }
    }

    /// Replace the kind
    pub fn with_kind(mut self, kind: TxKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach an access list
    pub fn with_access_list(mut self, access_list: Vec<AccessListItem>) -> Self {
        self.access_list = access_list;
        self
    }

    fn is_create(&self) -> bool {
        matches!(self.kind, TxKind::Create | TxKind::Create2 { .. })
    }
}

/// Address of a contract created with CREATE
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    address_from_hash(keccak256(&stream.out()))
}

/// Address of a contract created with CREATE2
pub fn create2_address(sender: &Address, salt: U256, init_code_hash: &H256) -> Address {
    let mut salt_bytes = [0u8; 32];
    salt.to_big_endian(&mut salt_bytes);

    let mut buf = Vec::with_capacity(85);
    buf.push(0xff);
    buf.extend_from_slice(sender.as_bytes());
    buf.extend_from_slice(&salt_bytes);
    buf.extend_from_slice(init_code_hash.as_bytes());
    address_from_hash(keccak256(&buf))
}

fn address_from_hash(hash: H256) -> Address {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

/// The execution engine
pub struct Evm<'a, DB: StateReader + StateWriter> {
    state: JournaledState<&'a mut DB>,
    env: Environment,
    config: EvmConfig,
    precompiles: Precompiles,
    code_cache: Arc<CodeCache>,
}

impl<'a, DB: StateReader + StateWriter> Evm<'a, DB> {
    /// Engine over `db` with the standard precompiles and a private cache
    pub fn new(db: &'a mut DB, env: Environment, config: EvmConfig) -> Self {
        Self {
            state: JournaledState::new(db),
            env,
            config,
            precompiles: Precompiles::standard(),
            code_cache: Arc::new(CodeCache::new()),
        }
    }

    /// Replace the precompile registry
    pub fn with_precompiles(mut self, precompiles: Precompiles) -> Self {
        self.precompiles = precompiles;
        self
    }

    /// Share a jump analysis cache with other engines
    pub fn with_code_cache(mut self, code_cache: Arc<CodeCache>) -> Self {
        self.code_cache = code_cache;
        self
    }

    /// Execution environment
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Mutable environment, e.g. to move to the next block
    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Configuration
    pub fn config(&self) -> &EvmConfig {
        &self.config
    }

    /// Precompile registry
    pub fn precompiles(&self) -> &Precompiles {
        &self.precompiles
    }

    /// Journaled view of the backend
    pub fn state(&mut self) -> &mut JournaledState<&'a mut DB> {
        &mut self.state
    }

    /// Write `code` at `address` straight to the backend
    pub fn install_code(&mut self, address: Address, code: Bytes) -> EvmResult<H256> {
        let hash = self.state.set_code(address, code)?;
        self.state.finalize()?;
        Ok(hash)
    }

    /// Execute a transaction and commit its effects if it succeeds
    ///
    /// A failed transaction leaves the backend untouched. Refunds are
    /// capped per the active hardfork and only paid on success.
    pub fn transact(&mut self, tx: Transaction) -> CallResult {
        tracing::debug!(
            caller = %tx.caller,
            kind = ?tx.kind,
            value = %tx.value,
            gas_limit = tx.gas_limit,
            "transaction start"
        );

        let hardfork = self.config.hardfork;
        let intrinsic = if self.config.intrinsic_gas {
            let keys = tx
                .access_list
                .iter()
                .map(|item| item.storage_keys.len() as u64)
                .sum::<u64>();
            gas::intrinsic_gas(
                hardfork,
                &tx.data,
                tx.is_create(),
                tx.access_list.len() as u64,
                keys,
            )
        } else {
            0
        };
        if intrinsic > tx.gas_limit {
            tracing::debug!(intrinsic, gas_limit = tx.gas_limit, "intrinsic gas exceeds limit");
            return CallResult::rejected(EvmError::OutOfGas, tx.gas_limit);
        }

        self.warm_transaction(&tx);
        if self.config.intrinsic_gas && !tx.is_create() {
            if let Err(err) = self.state.increment_nonce(tx.caller) {
                self.state.discard_transaction();
                return CallResult::rejected(err.into(), tx.gas_limit);
            }
        }

        let gas_limit = tx.gas_limit - intrinsic;
        let frame = match tx.kind {
            TxKind::Call(to) => self.call(CallInputs {
                scheme: CallScheme::Call,
                caller: tx.caller,
                target: to,
                code_address: to,
                value: CallValue::Transfer(tx.value),
                input: tx.data,
                gas_limit,
                is_static: false,
                depth: 0,
            }),
            TxKind::StaticCall(to) => self.call(CallInputs {
                scheme: CallScheme::StaticCall,
                caller: tx.caller,
                target: to,
                code_address: to,
                value: CallValue::Transfer(U256::zero()),
                input: tx.data,
                gas_limit,
                is_static: true,
                depth: 0,
            }),
            TxKind::DelegateCall(to) => self.call(CallInputs {
                scheme: CallScheme::DelegateCall,
                caller: tx.caller,
                target: tx.caller,
                code_address: to,
                value: CallValue::Apparent(tx.value),
                input: tx.data,
                gas_limit,
                is_static: false,
                depth: 0,
            }),
            TxKind::Create => self.create(CreateInputs {
                caller: tx.caller,
                scheme: CreateScheme::Create,
                value: tx.value,
                init_code: tx.data,
                gas_limit,
                depth: 0,
            }),
            TxKind::Create2 { salt } => self.create(CreateInputs {
                caller: tx.caller,
                scheme: CreateScheme::Create2 { salt },
                value: tx.value,
                init_code: tx.data,
                gas_limit,
                depth: 0,
            }),
        };

        self.finish(tx.gas_limit, frame)
    }

    fn warm_transaction(&mut self, tx: &Transaction) {
        self.state.warm_address(tx.caller);
        match tx.kind {
            TxKind::Call(to) | TxKind::StaticCall(to) | TxKind::DelegateCall(to) => {
                self.state.warm_address(to);
            }
            TxKind::Create | TxKind::Create2 { .. } => {}
        }
        let precompiles: Vec<Address> = self.precompiles.addresses().collect();
        for address in precompiles {
            self.state.warm_address(address);
        }
        for item in &tx.access_list {
            self.state.warm_address(item.address);
            for key in &item.storage_keys {
                self.state.warm_slot(item.address, *key);
            }
        }
        if self.config.hardfork.is_enabled_in(Hardfork::Shanghai) {
            self.state.warm_address(self.env.block.coinbase);
        }
    }

    fn finish(&mut self, gas_limit: u64, frame: FrameResult) -> CallResult {
        let success = frame.is_success();
        let mut tx_gas = Gas::new_spent(gas_limit);
        tx_gas.erase_cost(frame.gas.remaining());
        let refund = if success {
            tx_gas.record_refund(frame.gas.refunded());
            tx_gas.final_refund(self.config.hardfork.max_refund_quotient())
        } else {
            0
        };
        let gas_used = tx_gas.spent() - refund;

        let logs = if success {
            match self.state.finalize() {
                Ok(logs) => logs,
                Err(err) => {
                    tracing::warn!(error = %err, "state commit failed");
                    self.state.discard_transaction();
                    return CallResult::rejected(err.into(), gas_limit);
                }
            }
        } else {
            self.state.discard_transaction();
            Vec::new()
        };

        let revert_reason = if frame.exit.is_revert() {
            decode_revert_reason(&frame.output)
        } else {
            None
        };

        tracing::debug!(
            success,
            gas_used,
            refund,
            exit = ?frame.exit,
            logs = logs.len(),
            "transaction end"
        );

        CallResult {
            success,
            gas_left: gas_limit - gas_used,
            gas_used,
            gas_refunded: refund,
            output: frame.output,
            revert_reason,
            logs,
            exit: frame.exit,
            created_address: frame.created_address,
        }
    }

    /// Run a call frame and every frame it starts
    pub fn call(&mut self, inputs: CallInputs) -> FrameResult {
        match self.start_call(inputs) {
            FrameStart::Done(result) => result,
            FrameStart::Run(frame) => self.run_frames(frame),
        }
    }

    /// Run a create frame and every frame it starts
    pub fn create(&mut self, inputs: CreateInputs) -> FrameResult {
        match self.start_create(inputs) {
            FrameStart::Done(result) => result,
            FrameStart::Run(frame) => self.run_frames(frame),
        }
    }

    /// Drive `first` and its descendants until `first` returns
    ///
    /// Suspended parents wait on a heap stack, so native stack use does not
    /// grow with call depth.
    fn run_frames(&mut self, first: Box<Frame>) -> FrameResult {
        let mut current = first;
        let mut parents: Vec<Frame> = Vec::new();
        loop {
            let next = match current.interpreter.run(self) {
                InterpreterAction::Call(inputs) => self.start_call(*inputs),
                InterpreterAction::Create(inputs) => self.start_create(*inputs),
                InterpreterAction::Return(output) => {
                    let result = self.end_frame(current.kind, output);
                    match parents.pop() {
                        Some(parent) => {
                            current = Box::new(parent);
                            current.interpreter.resume(result);
                            continue;
                        }
                        None => return result,
                    }
                }
            };
            match next {
                FrameStart::Done(result) => current.interpreter.resume(result),
                FrameStart::Run(child) => parents.push(*std::mem::replace(&mut current, child)),
            }
        }
    }

    fn end_frame(&mut self, kind: FrameKind, output: InterpreterResult) -> FrameResult {
        match kind {
            FrameKind::Call { checkpoint, depth } => self.end_call(
                checkpoint,
                depth,
                FrameResult::new(output.exit, output.gas, output.output),
            ),
            FrameKind::Create {
                checkpoint,
                address,
                depth,
            } => self.end_create(checkpoint, address, depth, output),
        }
    }

    /// Open a call frame: depth check, checkpoint and value transfer
    ///
    /// Precompiles and code-less targets finish here without an interpreter.
    fn start_call(&mut self, inputs: CallInputs) -> FrameStart {
        tracing::debug!(
            scheme = ?inputs.scheme,
            target = %inputs.target,
            code = %inputs.code_address,
            gas = inputs.gas_limit,
            depth = inputs.depth,
            "call frame"
        );
        let gas_limit = inputs.gas_limit;
        let depth = inputs.depth;
        if depth > self.config.max_call_depth {
            return FrameStart::Done(FrameResult::not_entered(
                EvmError::CallDepthExceeded,
                gas_limit,
            ));
        }

        let checkpoint = self.state.snapshot();
        if let Err(err) =
            self.state
                .transfer(inputs.caller, inputs.target, inputs.value.transfer())
        {
            self.state.revert(checkpoint);
            return FrameStart::Done(FrameResult::not_entered(err.into(), gas_limit));
        }

        if let Some(precompile) = self.precompiles.get(&inputs.code_address).cloned() {
            tracing::debug!(address = %inputs.code_address, input_len = inputs.input.len(), "precompile");
            let result = run_precompile(precompile.as_ref(), &inputs.input, gas_limit);
            return FrameStart::Done(self.end_call(checkpoint, depth, result));
        }

        let (code, code_hash) = match self.state.code(inputs.code_address) {
            Ok(loaded) => loaded,
            Err(err) => {
                let result = FrameResult::halt(err.into(), gas_limit);
                return FrameStart::Done(self.end_call(checkpoint, depth, result));
            }
        };
        if code.is_empty() {
            let result = FrameResult::new(ExitReason::Stop, Gas::new(gas_limit), Bytes::new());
            return FrameStart::Done(self.end_call(checkpoint, depth, result));
        }

        let jumpdests = self.code_cache.get_or_analyze(code_hash, &code);
        let context = FrameContext {
            address: inputs.target,
            caller: inputs.caller,
            value: inputs.value.apparent(),
            input: inputs.input,
            is_static: inputs.is_static,
            depth,
        };
        FrameStart::Run(Box::new(Frame {
            interpreter: Interpreter::new(
                code,
                jumpdests,
                context,
                gas_limit,
                self.config.hardfork,
            ),
            kind: FrameKind::Call { checkpoint, depth },
        }))
    }

    fn end_call(&mut self, checkpoint: Checkpoint, depth: usize, result: FrameResult) -> FrameResult {
        if result.is_success() {
            self.state.commit(checkpoint);
        } else {
            self.state.revert(checkpoint);
        }
        tracing::debug!(
            exit = ?result.exit,
            gas_left = result.gas.remaining(),
            depth,
            "call frame done"
        );
        result
    }

    /// Open a create frame: creator checks, address derivation, collision
    /// check, checkpoint and endowment
    fn start_create(&mut self, inputs: CreateInputs) -> FrameStart {
        tracing::debug!(
            caller = %inputs.caller,
            scheme = ?inputs.scheme,
            init_len = inputs.init_code.len(),
            gas = inputs.gas_limit,
            depth = inputs.depth,
            "create frame"
        );
        let gas_limit = inputs.gas_limit;
        let depth = inputs.depth;
        if depth > self.config.max_call_depth {
            return FrameStart::Done(FrameResult::not_entered(
                EvmError::CallDepthExceeded,
                gas_limit,
            ));
        }
        let hardfork = self.config.hardfork;
        if hardfork.is_enabled_in(Hardfork::Shanghai)
            && inputs.init_code.len() > self.config.max_initcode_size
        {
            return FrameStart::Done(FrameResult::halt(
                EvmError::MaxInitCodeSizeExceeded,
                gas_limit,
            ));
        }

        let creator = match self.state.account(inputs.caller) {
            Ok(account) => account,
            Err(err) => return FrameStart::Done(FrameResult::halt(err.into(), gas_limit)),
        };
        if creator.balance < inputs.value {
            return FrameStart::Done(FrameResult::not_entered(
                EvmError::InsufficientBalance,
                gas_limit,
            ));
        }
        if creator.nonce == u64::MAX {
            return FrameStart::Done(FrameResult::not_entered(EvmError::NonceOverflow, gas_limit));
        }

        let address = match inputs.scheme {
            CreateScheme::Create => create_address(&inputs.caller, creator.nonce),
            CreateScheme::Create2 { salt } => {
                create2_address(&inputs.caller, salt, &keccak256(&inputs.init_code))
            }
        };
        if let Err(err) = self.state.increment_nonce(inputs.caller) {
            return FrameStart::Done(FrameResult::halt(err.into(), gas_limit));
        }
        self.state.warm_address(address);

        match self.state.account(address) {
            Ok(existing) if existing.nonce != 0 || existing.has_code() => {
                return FrameStart::Done(FrameResult::halt(EvmError::CreateCollision, gas_limit));
            }
            Ok(_) => {}
            Err(err) => return FrameStart::Done(FrameResult::halt(err.into(), gas_limit)),
        }

        let checkpoint = self.state.snapshot();
        self.state.mark_created(address);
        let setup = self
            .state
            .set_nonce(address, 1)
            .and_then(|_| self.state.transfer(inputs.caller, address, inputs.value));
        if let Err(err) = setup {
            self.state.revert(checkpoint);
            return FrameStart::Done(FrameResult::halt(err.into(), gas_limit));
        }

        let jumpdests = Arc::new(JumpDests::analyze(&inputs.init_code));
        let context = FrameContext {
            address,
            caller: inputs.caller,
            value: inputs.value,
            input: Bytes::new(),
            is_static: false,
            depth,
        };
        FrameStart::Run(Box::new(Frame {
            interpreter: Interpreter::new(inputs.init_code, jumpdests, context, gas_limit, hardfork),
            kind: FrameKind::Create {
                checkpoint,
                address,
                depth,
            },
        }))
    }

    fn end_create(
        &mut self,
        checkpoint: Checkpoint,
        address: Address,
        depth: usize,
        output: InterpreterResult,
    ) -> FrameResult {
        if !output.exit.is_success() {
            self.state.revert(checkpoint);
            return FrameResult::new(output.exit, output.gas, output.output);
        }

        match self.deploy(address, output.output, output.gas) {
            Ok((code, gas)) => {
                self.state.commit(checkpoint);
                tracing::debug!(%address, code_len = code.len(), depth, "contract created");
                FrameResult {
                    exit: output.exit,
                    gas,
                    output: code,
                    created_address: Some(address),
                }
            }
            Err(err) => {
                self.state.revert(checkpoint);
                FrameResult::halt(err, output.gas.limit())
            }
        }
    }

    /// Validate and store the code returned by init code
    fn deploy(&mut self, address: Address, code: Bytes, mut gas: Gas) -> EvmResult<(Bytes, Gas)> {
        if self.config.hardfork.is_enabled_in(Hardfork::London) && code.first() == Some(&0xEF) {
            return Err(EvmError::InvalidCodePrefix);
        }
        if code.len() > self.config.max_code_size {
            return Err(EvmError::MaxCodeSizeExceeded);
        }
        gas.charge(gas::code_deposit_cost(code.len()))?;
        self.state.set_code(address, code.clone())?;
        Ok((code, gas))
    }
}

/// A frame whose code is running or suspended on a child
struct Frame {
    interpreter: Interpreter,
    kind: FrameKind,
}

/// What to do with a frame's checkpoint when it returns
#[derive(Clone, Copy, Debug)]
enum FrameKind {
    Call {
        checkpoint: Checkpoint,
        depth: usize,
    },
    Create {
        checkpoint: Checkpoint,
        address: Address,
        depth: usize,
    },
}

enum FrameStart {
    /// Resolved without running code
    Done(FrameResult),
    /// Code to run
    Run(Box<Frame>),
}

fn run_precompile(precompile: &dyn Precompile, input: &[u8], gas_limit: u64) -> FrameResult {
    let cost = precompile.gas_cost(input);
    if cost > gas_limit {
        return FrameResult::halt(EvmError::OutOfGas, gas_limit);
    }
    match precompile.execute(input) {
        Ok(output) => FrameResult::new(ExitReason::Return, Gas::new(gas_limit - cost), output),
        Err(err) => FrameResult::halt(EvmError::PrecompileFailure(err.to_string()), gas_limit),
    }
}

impl<DB: StateReader + StateWriter> Host for Evm<'_, DB> {
    fn env(&self) -> &Environment {
        &self.env
    }

    fn config(&self) -> &EvmConfig {
        &self.config
    }

    fn load_account(&mut self, address: Address) -> EvmResult<AccountLoad> {
        let is_cold = self.state.warm_address(address);
        let is_empty = self.state.is_empty(address)?;
        Ok(AccountLoad { is_cold, is_empty })
    }

    fn balance(&mut self, address: Address) -> EvmResult<StateLoad<U256>> {
        let is_cold = self.state.warm_address(address);
        Ok(StateLoad::new(self.state.balance(address)?, is_cold))
    }

    fn code(&mut self, address: Address) -> EvmResult<StateLoad<Bytes>> {
        let is_cold = self.state.warm_address(address);
        let (code, _) = self.state.code(address)?;
        Ok(StateLoad::new(code, is_cold))
    }

    fn code_hash(&mut self, address: Address) -> EvmResult<StateLoad<H256>> {
        let is_cold = self.state.warm_address(address);
        let hash = if self.state.is_empty(address)? {
            H256::ZERO
        } else {
            self.state.code(address)?.1
        };
        Ok(StateLoad::new(hash, is_cold))
    }

    fn block_hash(&mut self, number: U256) -> EvmResult<H256> {
        let current = self.env.block.number;
        if number >= U256::from(current) {
            return Ok(H256::ZERO);
        }
        let number = number.low_u64();
        if current - number > 256 {
            return Ok(H256::ZERO);
        }
        Ok(self.state.block_hash(number)?)
    }

    fn sload(&mut self, address: Address, key: U256) -> EvmResult<StateLoad<U256>> {
        let is_cold = self.state.warm_slot(address, key);
        Ok(StateLoad::new(self.state.storage(address, key)?, is_cold))
    }

    fn sstore(&mut self, address: Address, key: U256, value: U256) -> EvmResult<SStoreResult> {
        let is_cold = self.state.warm_slot(address, key);
        let slot = self.state.slot(address, key)?;
        self.state.set_storage(address, key, value)?;
        Ok(SStoreResult {
            original: slot.original,
            present: slot.present,
            new: value,
            is_cold,
        })
    }

    fn tload(&mut self, address: Address, key: U256) -> U256 {
        self.state.tload(address, key)
    }

    fn tstore(&mut self, address: Address, key: U256, value: U256) {
        self.state.tstore(address, key, value);
    }

    fn log(&mut self, log: Log) {
        self.state.log(log);
    }

    fn selfdestruct(&mut self, address: Address, target: Address) -> EvmResult<SelfDestructResult> {
        let is_cold = self.state.warm_address(target);
        let balance = self.state.balance(address)?;
        let target_exists = !self.state.is_empty(target)?;
        let previously_destroyed = self.state.is_destroyed(&address);

        if target != address {
            self.state.transfer(address, target, balance)?;
        }
        // EIP-6780: only accounts created in this transaction are deleted
        if !self.config.hardfork.is_enabled_in(Hardfork::Cancun) || self.state.is_created(&address)
        {
            self.state.set_balance(address, U256::zero())?;
            self.state.mark_destroyed(address);
        }

        Ok(SelfDestructResult {
            had_value: !balance.is_zero(),
            target_exists,
            is_cold,
            previously_destroyed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BlockEnv, TxEnv};
    use bach_state::InMemoryDb;

    const CALLER: Address = Address::from_low_u64_be(0x01);
    const CONTRACT: Address = Address::from_low_u64_be(0x1000);

    fn env() -> Environment {
        Environment::new(
            BlockEnv::default(),
            TxEnv {
                origin: CALLER,
                ..TxEnv::default()
            },
        )
    }

    fn funded_db() -> InMemoryDb {
        let mut db = InMemoryDb::new();
        db.set_balance(CALLER, U256::exp10(20));
        db
    }

    fn call_inputs(target: Address, gas_limit: u64, depth: usize) -> CallInputs {
        CallInputs {
            scheme: CallScheme::Call,
            caller: CALLER,
            target,
            code_address: target,
            value: CallValue::Transfer(U256::zero()),
            input: Bytes::new(),
            gas_limit,
            is_static: false,
            depth,
        }
    }

    // ==================== Address derivation tests ====================

    #[test]
    fn test_create_address_vectors() {
        let sender = Address::from_hex("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            create_address(&sender, 0),
            Address::from_hex("0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap()
        );
        assert_eq!(
            create_address(&sender, 1),
            Address::from_hex("0x343c43a37d37dff08ae8c4a11544c718abb4fcf8").unwrap()
        );
    }

    #[test]
    fn test_create2_address_vectors() {
        let init_hash = keccak256(&[0x00]);
        assert_eq!(
            create2_address(&Address::ZERO, U256::zero(), &init_hash),
            Address::from_hex("0x4D1A2e2bB4F88F0250f26Ffff098B0b30B26BF38").unwrap()
        );
        let deadbeef = Address::from_hex("0xdeadbeef00000000000000000000000000000000").unwrap();
        assert_eq!(
            create2_address(&deadbeef, U256::zero(), &init_hash),
            Address::from_hex("0xB928f69Bb1D91Cd65274e3c79d8986362984fDA3").unwrap()
        );
    }

    // ==================== Frame tests ====================

    #[test]
    fn test_depth_limit_returns_gas() {
        let mut db = funded_db();
        db.deploy(CONTRACT, vec![0x00]);
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let result = evm.call(call_inputs(CONTRACT, 5000, 1025));
        assert_eq!(result.exit, ExitReason::Halt(EvmError::CallDepthExceeded));
        assert_eq!(result.gas.remaining(), 5000);
    }

    #[test]
    fn test_call_at_max_depth_cannot_go_deeper() {
        // CALL(gas, CONTRACT, 0, 0, 0, 0, 0) from a frame at depth 1024
        let code = [
            0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // out/in ranges, value
            0x61, 0x10, 0x00, // PUSH2 0x1000
            0x5A, // GAS
            0xF1, // CALL
            0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3,
        ];
        let mut db = funded_db();
        db.deploy(CONTRACT, code.to_vec());
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let result = evm.call(call_inputs(CONTRACT, 100_000, 1024));
        assert!(result.is_success());
        assert!(U256::from_big_endian(&result.output).is_zero());
        // The refused child's gas came back
        assert!(result.gas.remaining() > 90_000);
    }

    #[test]
    fn test_insufficient_balance_not_entered() {
        let mut db = InMemoryDb::new();
        db.deploy(CONTRACT, vec![0x00]);
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let mut inputs = call_inputs(CONTRACT, 10_000, 0);
        inputs.value = CallValue::Transfer(U256::one());
        let result = evm.call(inputs);
        assert_eq!(result.exit, ExitReason::Halt(EvmError::InsufficientBalance));
        assert_eq!(result.gas.remaining(), 10_000);
    }

    #[test]
    fn test_precompile_out_of_gas() {
        let mut db = funded_db();
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let result = evm.call(call_inputs(Address::from_low_u64_be(4), 10, 0));
        assert_eq!(result.exit, ExitReason::Halt(EvmError::OutOfGas));
        assert_eq!(result.gas.remaining(), 0);

        let result = evm.call(call_inputs(Address::from_low_u64_be(4), 100, 0));
        assert!(result.is_success());
        assert_eq!(result.gas.remaining(), 85);
    }

    #[test]
    fn test_block_hash_window() {
        let mut db = funded_db();
        db.insert_block_hash(5, H256::from_bytes([0x55; 32]));
        let mut environment = env();
        environment.block.number = 10;
        let mut evm = Evm::new(&mut db, environment, EvmConfig::default());
        assert_eq!(evm.block_hash(U256::from(5)).unwrap(), H256::from_bytes([0x55; 32]));
        assert_eq!(evm.block_hash(U256::from(10)).unwrap(), H256::ZERO);
        assert_eq!(evm.block_hash(U256::MAX).unwrap(), H256::ZERO);
    }

    #[test]
    fn test_code_hash_of_empty_account_is_zero() {
        let mut db = funded_db();
        db.deploy(CONTRACT, vec![0x00]);
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let missing = evm.code_hash(Address::from_low_u64_be(0xdead)).unwrap();
        assert!(missing.is_cold);
        assert_eq!(missing.data, H256::ZERO);
        assert_eq!(evm.code_hash(CALLER).unwrap().data, bach_state::EMPTY_CODE_HASH);
        assert_eq!(evm.code_hash(CONTRACT).unwrap().data, keccak256(&[0x00]));
    }

    // ==================== Transaction tests ====================

    #[test]
    fn test_intrinsic_gas_rejects() {
        let mut db = funded_db();
        let config = EvmConfig {
            intrinsic_gas: true,
            ..EvmConfig::default()
        };
        let mut evm = Evm::new(&mut db, env(), config);
        let result = evm.transact(Transaction::call(CALLER, CONTRACT, U256::zero(), Bytes::new(), 20_000));
        assert!(!result.success);
        assert_eq!(result.gas_used, 20_000);
    }

    #[test]
    fn test_intrinsic_gas_charged_and_nonce_bumped() {
        let mut db = funded_db();
        let config = EvmConfig {
            intrinsic_gas: true,
            ..EvmConfig::default()
        };
        let mut evm = Evm::new(&mut db, env(), config);
        let result = evm.transact(Transaction::call(CALLER, CONTRACT, U256::zero(), Bytes::new(), 50_000));
        assert!(result.success);
        assert_eq!(result.gas_used, 21_000);
        drop(evm);
        assert_eq!(db.account(&CALLER).map(|a| a.nonce), Some(1));
    }

    #[test]
    fn test_create_transaction_deploys() {
        // Init code returning a single STOP byte:
        // PUSH1 0, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, RETURN
        let init = vec![0x60, 0x00, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xF3];
        let mut db = funded_db();
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let result = evm.transact(Transaction::create(CALLER, U256::zero(), init.into(), 100_000));
        assert!(result.success);
        let expected = create_address(&CALLER, 0);
        assert_eq!(result.created_address, Some(expected));
        assert_eq!(result.output.as_ref(), &[0x00]);
        drop(evm);
        assert_eq!(db.code_at(&expected).as_ref(), &[0x00]);
        assert_eq!(db.account(&expected).map(|a| a.nonce), Some(1));
        assert_eq!(db.account(&CALLER).map(|a| a.nonce), Some(1));
    }

    #[test]
    fn test_create_rejects_ef_prefix() {
        // PUSH1 0xEF, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, RETURN
        let init = vec![0x60, 0xEF, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xF3];
        let mut db = funded_db();
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let result = evm.transact(Transaction::create(CALLER, U256::zero(), init.clone().into(), 100_000));
        assert_eq!(result.exit, ExitReason::Halt(EvmError::InvalidCodePrefix));
        assert_eq!(result.gas_left, 0);

        // Berlin predates EIP-3541
        let mut db = funded_db();
        let mut evm = Evm::new(&mut db, env(), EvmConfig::with_hardfork(Hardfork::Berlin));
        let result = evm.transact(Transaction::create(CALLER, U256::zero(), init.into(), 100_000));
        assert!(result.success);
    }

    #[test]
    fn test_failed_transaction_commits_nothing() {
        // PUSH1 1, PUSH1 0, SSTORE, INVALID
        let mut db = funded_db();
        db.deploy(CONTRACT, vec![0x60, 0x01, 0x60, 0x00, 0x55, 0xFE]);
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let result = evm.transact(Transaction::call(CALLER, CONTRACT, U256::from(7), Bytes::new(), 100_000));
        assert!(!result.success);
        assert!(result.logs.is_empty());
        drop(evm);
        assert!(db.storage_value(&CONTRACT, U256::zero()).is_zero());
        assert_eq!(db.account(&CALLER).map(|a| a.balance), Some(U256::exp10(20)));
    }

    #[test]
    fn test_delegate_call_transaction_runs_in_caller_context() {
        // PUSH1 1, PUSH1 0, SSTORE, STOP
        let mut db = funded_db();
        db.deploy(CONTRACT, vec![0x60, 0x01, 0x60, 0x00, 0x55, 0x00]);
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let tx = Transaction::call(CALLER, CONTRACT, U256::zero(), Bytes::new(), 100_000)
            .with_kind(TxKind::DelegateCall(CONTRACT));
        assert!(evm.transact(tx).success);
        drop(evm);
        assert_eq!(db.storage_value(&CALLER, U256::zero()), U256::one());
        assert!(db.storage_value(&CONTRACT, U256::zero()).is_zero());
    }

    #[test]
    fn test_access_list_prewarms_slot() {
        // PUSH1 0, SLOAD, STOP
        let mut db = funded_db();
        db.deploy(CONTRACT, vec![0x60, 0x00, 0x54, 0x00]);
        let mut evm = Evm::new(&mut db, env(), EvmConfig::default());
        let tx = Transaction::call(CALLER, CONTRACT, U256::zero(), Bytes::new(), 100_000)
            .with_access_list(vec![AccessListItem {
                address: CONTRACT,
                storage_keys: vec![U256::zero()],
            }]);
        let result = evm.transact(tx);
        assert_eq!(result.gas_used, 3 + 100);
    }
}
