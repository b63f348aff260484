use solana_program::{instruction::Instruction, pubkey::Pubkey, system_program};
use solana_program_test::*;
use solana_sdk::{
    instruction::InstructionError,
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
};

use vrf_coordinator::{
    error::CoordinatorError,
    instruction::{self, RandomWordsRequest},
    process_instruction,
    state::{
        find_coordinator_address, find_request_address, find_subscription_address, Coordinator,
        RandomnessRequest, Subscription,
    },
};

const BASE_FEE: u64 = 250_000_000_000_000_000;
const GAS_PRICE_LINK: u64 = 1_000_000_000;
const FUND_AMOUNT: u64 = 1_000_000_000_000_000_000;

const KEY_HASH: [u8; 32] = [
    0x47, 0x4e, 0x34, 0xa0, 0x77, 0xdf, 0x58, 0x80, 0x7d, 0xbe, 0x9c, 0x96, 0xd3, 0xc0, 0x09,
    0xb2, 0x3b, 0x3c, 0x6d, 0x0c, 0xce, 0x43, 0x3e, 0x59, 0xbb, 0xf5, 0xb3, 0x4f, 0x82, 0x3b,
    0xc5, 0x6c,
];

async fn setup() -> (ProgramTestContext, Pubkey) {
    let program_id = Pubkey::new_unique();
    let program_test = ProgramTest::new(
        "vrf_coordinator",
        program_id,
        processor!(process_instruction),
    );
    let mut context = program_test.start_with_context().await;

    let payer = context.payer.pubkey();
    process(
        &mut context,
        &[instruction::initialize(&program_id, &payer, BASE_FEE, GAS_PRICE_LINK)],
        &[],
    )
    .await
    .unwrap();

    (context, program_id)
}

/// Sign with the context payer plus `signers` and submit on a fresh blockhash.
async fn process(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let blockhash = context.get_new_latest_blockhash().await.unwrap();
    let mut all_signers = vec![&context.payer];
    all_signers.extend_from_slice(signers);
    let transaction = Transaction::new_signed_with_payer(
        instructions,
        Some(&context.payer.pubkey()),
        &all_signers,
        blockhash,
    );
    context.banks_client.process_transaction(transaction).await
}

fn assert_custom_error(result: Result<(), BanksClientError>, expected: CoordinatorError) {
    match result.unwrap_err().unwrap() {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
            assert_eq!(code, expected as u32, "expected {:?}", expected)
        }
        other => panic!("expected {:?}, got {:?}", expected, other),
    }
}

async fn coordinator_state(context: &mut ProgramTestContext, program_id: &Pubkey) -> Coordinator {
    let (address, _) = find_coordinator_address(program_id);
    let account = context.banks_client.get_account(address).await.unwrap().unwrap();
    Coordinator::load(&account.data).unwrap()
}

async fn subscription_state(
    context: &mut ProgramTestContext,
    program_id: &Pubkey,
    subscription_id: u64,
) -> Subscription {
    let (address, _) = find_subscription_address(program_id, subscription_id);
    let account = context.banks_client.get_account(address).await.unwrap().unwrap();
    Subscription::load(&account.data).unwrap()
}

/// Create subscription 1 owned by the payer, optionally funded, with `consumer` registered.
async fn create_subscription(
    context: &mut ProgramTestContext,
    program_id: &Pubkey,
    consumer: &Pubkey,
    amount: u64,
) {
    let owner = context.payer.pubkey();
    let mut instructions = vec![
        instruction::create_subscription(program_id, &owner, 1),
        instruction::add_consumer(program_id, &owner, 1, consumer),
    ];
    if amount > 0 {
        instructions.push(instruction::fund_subscription(program_id, &owner, 1, amount));
    }
    process(context, &instructions, &[]).await.unwrap();
}

fn random_words_request(num_words: u32) -> RandomWordsRequest {
    RandomWordsRequest {
        key_hash: KEY_HASH,
        subscription_id: 1,
        minimum_request_confirmations: 3,
        callback_gas_limit: 500_000,
        num_words,
    }
}

async fn request(
    context: &mut ProgramTestContext,
    program_id: &Pubkey,
    requester: &Keypair,
    request: RandomWordsRequest,
) -> Result<(), BanksClientError> {
    let payer = context.payer.pubkey();
    let request_id = coordinator_state(context, program_id).await.next_request_id;
    process(
        context,
        &[instruction::request_random_words_with_id(
            program_id,
            &requester.pubkey(),
            &payer,
            request_id,
            request,
        )],
        &[requester],
    )
    .await
}

#[tokio::test]
async fn test_initialize() {
    let (mut context, program_id) = setup().await;

    let coordinator = coordinator_state(&mut context, &program_id).await;
    assert_eq!(coordinator.admin, context.payer.pubkey());
    assert_eq!(coordinator.base_fee, BASE_FEE);
    assert_eq!(coordinator.gas_price_link, GAS_PRICE_LINK);
    assert_eq!(coordinator.current_subscription_id, 0);
    assert_eq!(coordinator.next_request_id, 1);

    let payer = context.payer.pubkey();
    let result = process(
        &mut context,
        &[instruction::initialize(&program_id, &payer, 1, 1)],
        &[],
    )
    .await;
    assert_eq!(
        result.unwrap_err().unwrap(),
        TransactionError::InstructionError(0, InstructionError::AccountAlreadyInitialized)
    );
}

#[tokio::test]
async fn test_subscription_lifecycle() {
    let (mut context, program_id) = setup().await;
    let owner = context.payer.pubkey();
    let consumer = Pubkey::new_unique();

    process(
        &mut context,
        &[
            instruction::create_subscription(&program_id, &owner, 1),
            instruction::fund_subscription(&program_id, &owner, 1, FUND_AMOUNT),
        ],
        &[],
    )
    .await
    .unwrap();

    let subscription = subscription_state(&mut context, &program_id, 1).await;
    assert_eq!(subscription.owner, owner);
    assert_eq!(subscription.balance, FUND_AMOUNT);
    assert!(subscription.consumers.is_empty());
    assert_eq!(
        coordinator_state(&mut context, &program_id).await.current_subscription_id,
        1
    );

    // Registering twice keeps a single entry
    process(
        &mut context,
        &[
            instruction::add_consumer(&program_id, &owner, 1, &consumer),
            instruction::add_consumer(&program_id, &owner, 1, &consumer),
        ],
        &[],
    )
    .await
    .unwrap();
    let subscription = subscription_state(&mut context, &program_id, 1).await;
    assert_eq!(subscription.consumers, vec![consumer]);

    process(
        &mut context,
        &[instruction::remove_consumer(&program_id, &owner, 1, &consumer)],
        &[],
    )
    .await
    .unwrap();
    assert!(subscription_state(&mut context, &program_id, 1)
        .await
        .consumers
        .is_empty());

    let result = process(
        &mut context,
        &[instruction::remove_consumer(&program_id, &owner, 1, &consumer)],
        &[],
    )
    .await;
    assert_custom_error(result, CoordinatorError::InvalidConsumer);
}

#[tokio::test]
async fn test_only_owner_can_add_consumer() {
    let (mut context, program_id) = setup().await;
    let owner = context.payer.pubkey();
    process(
        &mut context,
        &[instruction::create_subscription(&program_id, &owner, 1)],
        &[],
    )
    .await
    .unwrap();

    let stranger = Keypair::new();
    let result = process(
        &mut context,
        &[instruction::add_consumer(
            &program_id,
            &stranger.pubkey(),
            1,
            &Pubkey::new_unique(),
        )],
        &[&stranger],
    )
    .await;
    assert_custom_error(result, CoordinatorError::MustBeSubOwner);
}

#[tokio::test]
async fn test_request_from_unregistered_consumer_fails() {
    let (mut context, program_id) = setup().await;
    create_subscription(&mut context, &program_id, &Pubkey::new_unique(), FUND_AMOUNT).await;

    let requester = Keypair::new();
    let result = request(&mut context, &program_id, &requester, random_words_request(1)).await;
    assert_custom_error(result, CoordinatorError::InvalidConsumer);
}

#[tokio::test]
async fn test_request_from_missing_subscription_fails() {
    let (mut context, program_id) = setup().await;

    let requester = Keypair::new();
    let result = request(&mut context, &program_id, &requester, random_words_request(1)).await;
    assert_custom_error(result, CoordinatorError::InvalidSubscription);
}

#[tokio::test]
async fn test_request_records_pending_request() {
    let (mut context, program_id) = setup().await;
    let requester = Keypair::new();
    create_subscription(&mut context, &program_id, &requester.pubkey(), FUND_AMOUNT).await;

    request(&mut context, &program_id, &requester, random_words_request(1))
        .await
        .unwrap();

    let (address, _) = find_request_address(&program_id, 1);
    let account = context.banks_client.get_account(address).await.unwrap().unwrap();
    let pending = RandomnessRequest::load(&account.data).unwrap();
    assert_eq!(pending.request_id, 1);
    assert_eq!(pending.subscription_id, 1);
    assert_eq!(pending.consumer, requester.pubkey());
    assert_eq!(pending.callback_program, system_program::id());
    assert_eq!(pending.key_hash, KEY_HASH);
    assert_eq!(pending.minimum_request_confirmations, 3);
    assert_eq!(pending.callback_gas_limit, 500_000);
    assert_eq!(pending.num_words, 1);

    assert_eq!(
        coordinator_state(&mut context, &program_id).await.next_request_id,
        2
    );
}

#[tokio::test]
async fn test_request_bounds() {
    let (mut context, program_id) = setup().await;
    let requester = Keypair::new();
    create_subscription(&mut context, &program_id, &requester.pubkey(), FUND_AMOUNT).await;

    let result = request(&mut context, &program_id, &requester, random_words_request(501)).await;
    assert_custom_error(result, CoordinatorError::NumWordsTooBig);

    let mut too_many_confirmations = random_words_request(1);
    too_many_confirmations.minimum_request_confirmations = 201;
    let result = request(&mut context, &program_id, &requester, too_many_confirmations).await;
    assert_custom_error(result, CoordinatorError::InvalidRequestConfirmations);

    let mut gas_limit_too_big = random_words_request(1);
    gas_limit_too_big.callback_gas_limit = 2_500_001;
    let result = request(&mut context, &program_id, &requester, gas_limit_too_big).await;
    assert_custom_error(result, CoordinatorError::GasLimitTooBig);

    // Nothing was recorded
    assert_eq!(
        coordinator_state(&mut context, &program_id).await.next_request_id,
        1
    );
}

#[tokio::test]
async fn test_fulfill_nonexistent_request_fails() {
    let (mut context, program_id) = setup().await;
    let requester = Keypair::new();
    create_subscription(&mut context, &program_id, &requester.pubkey(), FUND_AMOUNT).await;
    let fulfiller = context.payer.pubkey();

    for request_id in [0u64, 1] {
        let result = process(
            &mut context,
            &[instruction::fulfill_random_words(
                &program_id,
                &fulfiller,
                1,
                request_id,
                &system_program::id(),
                None,
                vec![],
            )],
            &[],
        )
        .await;
        assert_custom_error(result, CoordinatorError::NonexistentRequest);
    }
}

#[tokio::test]
async fn test_fulfill_charges_subscription() {
    let (mut context, program_id) = setup().await;
    let requester = Keypair::new();
    create_subscription(&mut context, &program_id, &requester.pubkey(), 0).await;
    request(&mut context, &program_id, &requester, random_words_request(1))
        .await
        .unwrap();
    let fulfiller = context.payer.pubkey();

    let result = process(
        &mut context,
        &[instruction::fulfill_random_words(
            &program_id,
            &fulfiller,
            1,
            1,
            &system_program::id(),
            None,
            vec![],
        )],
        &[],
    )
    .await;
    assert_custom_error(result, CoordinatorError::InsufficientBalance);
}

#[tokio::test]
async fn test_fulfill_rejects_wrong_word_count() {
    let (mut context, program_id) = setup().await;
    let requester = Keypair::new();
    create_subscription(&mut context, &program_id, &requester.pubkey(), FUND_AMOUNT).await;
    request(&mut context, &program_id, &requester, random_words_request(1))
        .await
        .unwrap();
    let fulfiller = context.payer.pubkey();

    let result = process(
        &mut context,
        &[instruction::fulfill_random_words(
            &program_id,
            &fulfiller,
            1,
            1,
            &system_program::id(),
            Some(vec![[1; 32], [2; 32]]),
            vec![],
        )],
        &[],
    )
    .await;
    assert_custom_error(result, CoordinatorError::InvalidRandomWords);
}

#[tokio::test]
async fn test_fulfill_override_requires_admin() {
    let (mut context, program_id) = setup().await;
    let requester = Keypair::new();
    create_subscription(&mut context, &program_id, &requester.pubkey(), FUND_AMOUNT).await;
    request(&mut context, &program_id, &requester, random_words_request(1))
        .await
        .unwrap();

    let entrant = Keypair::new();
    let result = process(
        &mut context,
        &[instruction::fulfill_random_words(
            &program_id,
            &entrant.pubkey(),
            1,
            1,
            &system_program::id(),
            Some(vec![[7; 32]]),
            vec![],
        )],
        &[&entrant],
    )
    .await;
    assert_custom_error(result, CoordinatorError::MustBeAdmin);

    // The request is still outstanding and the subscription was not charged
    let (address, _) = find_request_address(&program_id, 1);
    assert!(context.banks_client.get_account(address).await.unwrap().is_some());
    assert_eq!(
        subscription_state(&mut context, &program_id, 1).await.balance,
        FUND_AMOUNT
    );
}
